//! # PID controllers
//!
//! Two discrete controller variants are provided behind the [`PidController`] trait:
//!
//! - [`PositionalPid`] - classic positional form with an accumulated integral, integral and
//!   derivative deadbands, and separate integral and output limits.
//! - [`IncrementalPid`] - velocity form computed from the last three errors, with a derivative
//!   dead zone around zero error.
//!
//! Both controllers are time-aware and take their `dt` from the monotonic clock. Use `update_at` to
//! drive them from an explicit clock.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod incremental;
mod positional;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Instant;

pub use incremental::*;
pub use positional::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time step used when the measured step is zero or negative.
///
/// Units: seconds
pub const DT_EPSILON_S: f64 = 0.01;

/// Default dead zone of the incremental controller's derivative term.
pub const DEFAULT_D_DEADBAND: f64 = 2.0;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Common interface for the PID controller variants.
pub trait PidController {
    /// Set the gains and the output limit.
    ///
    /// Variants with a separate integral limit set it to the same value.
    fn configure(&mut self, gains: PidGains, limit: f64);

    /// Set the value the controller drives the feedback towards.
    fn set_target(&mut self, target: f64);

    /// The current target.
    fn target(&self) -> f64;

    /// Clear the integral, error history and stored output. Gains and limits are kept.
    fn reset(&mut self);

    /// Update the controller with a new feedback sample taken at `now`, returning the output.
    fn update_at(&mut self, feedback: f64, now: Instant) -> f64;

    /// Update the controller with a new feedback sample taken now, returning the output.
    fn update(&mut self, feedback: f64) -> f64 {
        self.update_at(feedback, Instant::now())
    }

    /// The most recent output.
    fn output(&self) -> f64;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Proportional, integral and derivative gains.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Parameters selecting and configuring one controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum PidParams {
    Positional {
        gains: PidGains,

        /// Output limit. Also used as the integral limit unless `integral_limit` is set.
        limit: f64,

        /// Limit on the magnitude of the accumulated integral.
        #[serde(default)]
        integral_limit: Option<f64>,

        /// Errors with a magnitude at or below this are not integrated.
        #[serde(default)]
        int_deadband: f64,

        /// Error changes with a magnitude at or below this give no derivative.
        #[serde(default)]
        dif_deadband: f64,

        /// Minimum time between accepted samples.
        ///
        /// Units: seconds
        #[serde(default)]
        sample_time_s: f64,
    },
    Incremental {
        gains: PidGains,

        /// Output limit.
        limit: f64,

        /// Minimum time between accepted samples.
        ///
        /// Units: seconds
        #[serde(default)]
        sample_time_s: f64,

        /// Errors with a magnitude at or below this give no derivative.
        #[serde(default = "default_d_deadband")]
        d_deadband: f64,
    },
}

/// A controller of either variant.
#[derive(Debug, Clone)]
pub enum AxisPid {
    Positional(PositionalPid),
    Incremental(IncrementalPid),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PidParams {
    fn default() -> Self {
        PidParams::Positional {
            gains: PidGains {
                k_p: 0.3,
                k_i: 0.0,
                k_d: 0.0,
            },
            limit: 2.0,
            integral_limit: None,
            int_deadband: 0.0,
            dif_deadband: 0.0,
            sample_time_s: 0.0,
        }
    }
}

impl PidParams {
    /// Build a fresh controller from these parameters.
    pub fn build(&self) -> AxisPid {
        match *self {
            PidParams::Positional {
                gains,
                limit,
                integral_limit,
                int_deadband,
                dif_deadband,
                sample_time_s,
            } => {
                let mut pid = PositionalPid::new(gains, limit);
                pid.set_limits(
                    int_deadband,
                    dif_deadband,
                    integral_limit.unwrap_or(limit),
                    limit,
                );
                pid.set_sample_time(sample_time_s);
                AxisPid::Positional(pid)
            }
            PidParams::Incremental {
                gains,
                limit,
                sample_time_s,
                d_deadband,
            } => {
                let mut pid = IncrementalPid::new(gains, limit, sample_time_s);
                pid.set_d_deadband(d_deadband);
                AxisPid::Incremental(pid)
            }
        }
    }
}

impl Default for AxisPid {
    fn default() -> Self {
        PidParams::default().build()
    }
}

impl PidController for AxisPid {
    fn configure(&mut self, gains: PidGains, limit: f64) {
        match self {
            AxisPid::Positional(p) => p.configure(gains, limit),
            AxisPid::Incremental(p) => p.configure(gains, limit),
        }
    }

    fn set_target(&mut self, target: f64) {
        match self {
            AxisPid::Positional(p) => p.set_target(target),
            AxisPid::Incremental(p) => p.set_target(target),
        }
    }

    fn target(&self) -> f64 {
        match self {
            AxisPid::Positional(p) => p.target(),
            AxisPid::Incremental(p) => p.target(),
        }
    }

    fn reset(&mut self) {
        match self {
            AxisPid::Positional(p) => p.reset(),
            AxisPid::Incremental(p) => p.reset(),
        }
    }

    fn update_at(&mut self, feedback: f64, now: Instant) -> f64 {
        match self {
            AxisPid::Positional(p) => p.update_at(feedback, now),
            AxisPid::Incremental(p) => p.update_at(feedback, now),
        }
    }

    fn output(&self) -> f64 {
        match self {
            AxisPid::Positional(p) => p.output(),
            AxisPid::Incremental(p) => p.output(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_d_deadband() -> f64 {
    DEFAULT_D_DEADBAND
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[derive(serde::Deserialize)]
    struct Axes {
        x: PidParams,
        y: PidParams,
    }

    #[test]
    fn test_params_from_toml() {
        let axes: Axes = toml::from_str(
            r#"
            [x]
            variant = "positional"
            gains = { k_p = 0.3, k_i = 0.0, k_d = 0.0 }
            limit = 2.0

            [y]
            variant = "incremental"
            gains = { k_p = 0.5, k_i = 0.1, k_d = 0.05 }
            limit = 100.0
            sample_time_s = 0.02
            "#,
        )
        .unwrap();

        assert_eq!(axes.x, PidParams::default());
        assert_eq!(
            axes.y,
            PidParams::Incremental {
                gains: PidGains {
                    k_p: 0.5,
                    k_i: 0.1,
                    k_d: 0.05
                },
                limit: 100.0,
                sample_time_s: 0.02,
                d_deadband: DEFAULT_D_DEADBAND,
            }
        );
    }

    #[test]
    fn test_output_bounded_both_variants() {
        let params = [
            PidParams::Positional {
                gains: PidGains {
                    k_p: 5.0,
                    k_i: 3.0,
                    k_d: 1.0,
                },
                limit: 10.0,
                integral_limit: None,
                int_deadband: 0.0,
                dif_deadband: 0.0,
                sample_time_s: 0.0,
            },
            PidParams::Incremental {
                gains: PidGains {
                    k_p: 5.0,
                    k_i: 3.0,
                    k_d: 1.0,
                },
                limit: 10.0,
                sample_time_s: 0.0,
                d_deadband: DEFAULT_D_DEADBAND,
            },
        ];

        for p in params.iter() {
            let mut pid = p.build();
            pid.set_target(0.0);

            let t0 = Instant::now();
            for i in 0..200u64 {
                // Wild, alternating feedback
                let sign = if i % 2 == 0 { 1e6 } else { -3e5 };
                let fb = sign * (i as f64 + 1.0);
                let out = pid.update_at(fb, t0 + Duration::from_millis(10 * i));
                assert!(out.abs() <= 10.0, "{:?} gave {}", p, out);
            }
        }
    }
}
