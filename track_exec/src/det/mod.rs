//! # Detection module
//!
//! Detection of the spot and of the polygon vertex markers is performed by an external vision
//! collaborator. This module defines the capabilities the tracking loop needs from it, and the
//! single-slot handoff used when detections arrive on a worker thread.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod filter;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::det::DetectionMsg;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::path::Point2D;

pub use filter::*;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something which can locate the spot.
pub trait Detector {
    /// Locate the spot, or `None` if it is not visible.
    fn detect(&mut self) -> Option<Point2D>;
}

/// Something which can locate the polygon vertex markers.
pub trait VertexDetector {
    /// Locate the vertex markers, in no particular order.
    fn detect_vertices(&mut self) -> Vec<Point2D>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One consistent view of the detections, taken once per cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    /// The most recent spot detection, `None` if the last message said the spot was not found.
    pub spot: Option<Point2D>,

    /// The most recent vertex detection.
    pub vertices: Vec<Point2D>,

    /// A spot detection has been published since the previous snapshot.
    pub fresh: bool,
}

/// Most-recent-value-wins handoff between a detection producer and the tracking loop.
///
/// The latest published values are kept until newer ones replace them, so a cycle with no new
/// camera frame still sees the last detection. Only an explicit no-spot clears the spot.
#[derive(Clone, Default)]
pub struct DetectionSlot {
    inner: Arc<Mutex<Latest>>,
}

#[derive(Default)]
struct Latest {
    spot: Option<Point2D>,
    vertices: Vec<Point2D>,
    fresh: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DetectionSlot {
    /// Create a new, empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a spot detection, `None` meaning the spot was looked for and not found.
    pub fn publish_spot(&self, spot: Option<Point2D>) {
        let mut latest = self.inner.lock();
        latest.spot = spot;
        latest.fresh = true;
    }

    /// Publish a vertex detection.
    pub fn publish_vertices(&self, vertices: Vec<Point2D>) {
        self.inner.lock().vertices = vertices;
    }

    /// Publish a detection message received from the vision collaborator.
    pub fn publish_msg(&self, msg: DetectionMsg) {
        match msg {
            DetectionMsg::NoSpot => self.publish_spot(None),
            DetectionMsg::Spot { x, y } => {
                self.publish_spot(Some(Point2D::new(x as f64, y as f64)))
            }
            DetectionMsg::Vertices(v) => self.publish_vertices(
                v.into_iter()
                    .map(|(x, y)| Point2D::new(x as f64, y as f64))
                    .collect(),
            ),
        }
    }

    /// Take a snapshot of the latest detections, clearing the fresh flag.
    pub fn snapshot(&self) -> Snapshot {
        let mut latest = self.inner.lock();
        let fresh = latest.fresh;
        latest.fresh = false;

        Snapshot {
            spot: latest.spot,
            vertices: latest.vertices.clone(),
            fresh,
        }
    }
}

impl Detector for DetectionSlot {
    fn detect(&mut self) -> Option<Point2D> {
        self.inner.lock().spot
    }
}

impl VertexDetector for DetectionSlot {
    fn detect_vertices(&mut self) -> Vec<Point2D> {
        self.inner.lock().vertices.clone()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn test_latest_value_wins() {
        let slot = DetectionSlot::new();
        assert_eq!(slot.snapshot(), Snapshot::default());

        slot.publish_spot(Some(Point2D::new(1.0, 1.0)));
        slot.publish_spot(Some(Point2D::new(2.0, 3.0)));

        let snap = slot.snapshot();
        assert_eq!(snap.spot, Some(Point2D::new(2.0, 3.0)));
        assert!(snap.fresh);
        assert!(snap.vertices.is_empty());
    }

    #[test]
    fn test_detection_kept_until_replaced() {
        let slot = DetectionSlot::new();
        slot.publish_msg(DetectionMsg::Spot { x: 50, y: 60 });
        slot.publish_msg(DetectionMsg::Vertices(vec![(0, 0), (4, 0), (4, 4)]));

        let first = slot.snapshot();
        assert!(first.fresh);

        // No new camera frame before the next cycle
        let second = slot.snapshot();
        assert!(!second.fresh);
        assert_eq!(second.spot, Some(Point2D::new(50.0, 60.0)));
        assert_eq!(second.vertices, first.vertices);
    }

    #[test]
    fn test_no_spot_clears_spot() {
        let slot = DetectionSlot::new();

        slot.publish_msg(DetectionMsg::Spot { x: 10, y: 20 });
        slot.snapshot();
        slot.publish_msg(DetectionMsg::NoSpot);

        let snap = slot.snapshot();
        assert!(snap.fresh);
        assert_eq!(snap.spot, None);
        assert_eq!(slot.snapshot().spot, None);
    }

    #[test]
    fn test_capabilities() {
        let mut slot = DetectionSlot::new();
        slot.publish_msg(DetectionMsg::Vertices(vec![(0, 0), (5, 5)]));
        slot.publish_msg(DetectionMsg::Spot { x: 4, y: -2 });

        assert_eq!(slot.detect(), Some(Point2D::new(4.0, -2.0)));
        assert_eq!(slot.detect(), Some(Point2D::new(4.0, -2.0)));
        assert_eq!(
            slot.detect_vertices(),
            vec![Point2D::new(0.0, 0.0), Point2D::new(5.0, 5.0)]
        );
    }

    #[test]
    fn test_handoff_across_threads() {
        let slot = DetectionSlot::new();
        let producer = slot.clone();

        thread::spawn(move || {
            for i in 0..100 {
                producer.publish_spot(Some(Point2D::new(i as f64, 0.0)));
            }
        })
        .join()
        .unwrap();

        assert_eq!(slot.snapshot().spot, Some(Point2D::new(99.0, 0.0)));
    }
}
