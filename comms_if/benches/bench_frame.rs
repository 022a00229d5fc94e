//! # Frame Codec Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use comms_if::{
    eqpt::coords::CoordQuad,
    frame::{self, FrameReceiver},
};

fn frame_benchmark(c: &mut Criterion) {
    // ---- Build test data ----

    let quad = CoordQuad::new((160, 120), (200, 80)).to_payload();
    let large_payload: Vec<u8> = (0..4096).map(|i| i as u8).collect();
    let large_frame = frame::encode(&large_payload).unwrap();

    // A noisy stream of 64 status frames with a corrupt frame every 8th
    let mut stream = Vec::new();
    for i in 0..64 {
        stream.extend_from_slice(&[0x01, 0x02, 0x03]);
        let mut f = frame::encode(&quad).unwrap();
        if i % 8 == 0 {
            f[5] ^= 0xFF;
        }
        stream.extend_from_slice(&f);
    }

    // ---- Benchmarks ----

    c.bench_function("frame::encode::coord_quad", |b| {
        b.iter(|| frame::encode(black_box(&quad)).unwrap())
    });

    c.bench_function("frame::is_valid::4k", |b| {
        b.iter(|| frame::is_valid(black_box(&large_frame)))
    });

    c.bench_function("FrameReceiver::next_payload::noisy_stream", |b| {
        b.iter(|| {
            let mut rx = FrameReceiver::default();
            rx.push(black_box(&stream));
            let mut count = 0;
            while rx.next_payload().is_some() {
                count += 1;
            }
            count
        })
    });
}

criterion_group!(benches, frame_benchmark);
criterion_main!(benches);
