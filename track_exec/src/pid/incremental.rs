//! Incremental (velocity form) PID controller

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use std::time::Instant;
use util::maths::clamp_sym;

use super::{PidController, PidGains, DEFAULT_D_DEADBAND};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An incremental PID controller.
///
/// On each accepted sample:
/// - `P = k_p * (e - e1)`
/// - `I = k_i * e`
/// - `D = k_d * (e - 2 * e1 + e2)`, or zero when `|e| <= d_deadband`
///
/// and the output is `P + I + D` clamped to `±olimit`.
#[derive(Debug, Clone, Serialize)]
pub struct IncrementalPid {
    gains: PidGains,

    target: f64,

    /// Output limit
    olimit: f64,

    /// Minimum time between accepted samples in seconds
    sample_time_s: f64,

    /// Dead zone of the derivative term
    d_deadband: f64,

    /// Previous error
    e1: f64,

    /// Error before the previous one
    e2: f64,

    /// Instant of the last accepted sample
    #[serde(skip)]
    last_time: Option<Instant>,

    output: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl IncrementalPid {
    /// Create a new controller.
    pub fn new(gains: PidGains, limit: f64, sample_time_s: f64) -> Self {
        Self {
            gains,
            target: 0.0,
            olimit: limit.abs(),
            sample_time_s: sample_time_s.max(0.0),
            d_deadband: DEFAULT_D_DEADBAND,
            e1: 0.0,
            e2: 0.0,
            last_time: None,
            output: 0.0,
        }
    }

    /// Set the derivative dead zone.
    pub fn set_d_deadband(&mut self, d_deadband: f64) {
        self.d_deadband = d_deadband.abs();
    }
}

impl PidController for IncrementalPid {
    fn configure(&mut self, gains: PidGains, limit: f64) {
        self.gains = gains;
        self.olimit = limit.abs();
    }

    fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn reset(&mut self) {
        self.e1 = 0.0;
        self.e2 = 0.0;
        self.last_time = None;
        self.output = 0.0;
    }

    fn update_at(&mut self, feedback: f64, now: Instant) -> f64 {
        // Hold the previous output between samples
        if let Some(t0) = self.last_time {
            if now.saturating_duration_since(t0).as_secs_f64() < self.sample_time_s {
                return self.output;
            }
        }

        let error = self.target - feedback;

        let p = self.gains.k_p * (error - self.e1);
        let i = self.gains.k_i * error;
        let d = if error.abs() <= self.d_deadband {
            0.0
        } else {
            self.gains.k_d * (error - 2.0 * self.e1 + self.e2)
        };

        self.e2 = self.e1;
        self.e1 = error;
        self.last_time = Some(now);

        self.output = clamp_sym(p + i + d, self.olimit);
        self.output
    }

    fn output(&self) -> f64 {
        self.output
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
