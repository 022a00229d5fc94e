//! Positional form PID controller

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use std::time::Instant;
use util::maths::clamp_sym;

use super::{PidController, PidGains, DT_EPSILON_S};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A positional PID controller.
///
/// `output = k_p * e + k_i * I + k_d * D`, where the integral `I` is clamped to `±slimit` after
/// every update and the output to `±olimit`.
#[derive(Debug, Clone, Serialize)]
pub struct PositionalPid {
    gains: PidGains,

    target: f64,

    /// Errors with a magnitude at or below this are not integrated
    int_deadband: f64,

    /// Error changes with a magnitude at or below this give no derivative
    dif_deadband: f64,

    /// Integral limit
    slimit: f64,

    /// Output limit
    olimit: f64,

    /// Minimum time between accepted samples in seconds
    sample_time_s: f64,

    /// The integral accumulation
    integral: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// Previous instant that a sample was accepted
    #[serde(skip)]
    prev_time: Option<Instant>,

    output: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PositionalPid {
    /// Create a new controller with the given gains, using `limit` for both the integral and the
    /// output.
    pub fn new(gains: PidGains, limit: f64) -> Self {
        Self {
            gains,
            target: 0.0,
            int_deadband: 0.0,
            dif_deadband: 0.0,
            slimit: limit.abs(),
            olimit: limit.abs(),
            sample_time_s: 0.0,
            integral: 0.0,
            prev_error: None,
            prev_time: None,
            output: 0.0,
        }
    }

    /// Set the integral and derivative deadbands and the integral and output limits.
    pub fn set_limits(&mut self, int_deadband: f64, dif_deadband: f64, slimit: f64, olimit: f64) {
        self.int_deadband = int_deadband.abs();
        self.dif_deadband = dif_deadband.abs();
        self.slimit = slimit.abs();
        self.olimit = olimit.abs();
    }

    /// Set the minimum time between accepted samples.
    pub fn set_sample_time(&mut self, sample_time_s: f64) {
        self.sample_time_s = sample_time_s.max(0.0);
    }

    /// The current integral accumulation.
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

impl PidController for PositionalPid {
    fn configure(&mut self, gains: PidGains, limit: f64) {
        self.gains = gains;
        self.slimit = limit.abs();
        self.olimit = limit.abs();
    }

    fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.prev_time = None;
        self.output = 0.0;
    }

    fn update_at(&mut self, feedback: f64, now: Instant) -> f64 {
        let error = self.target - feedback;

        // Time since the previous accepted sample, there is none after a reset
        let dt = match self.prev_time {
            Some(t0) => {
                let dt = now.saturating_duration_since(t0).as_secs_f64();
                if dt < self.sample_time_s {
                    return self.output;
                }
                if dt <= 0.0 {
                    Some(DT_EPSILON_S)
                } else {
                    Some(dt)
                }
            }
            None => None,
        };

        // Accumulate the integral outside the deadband.
        //
        // With no dt there is nothing to integrate over, adding the raw error instead would give
        // a spike on the first sample.
        if let Some(dt) = dt {
            if error.abs() > self.int_deadband {
                self.integral += error * dt;
            }
        }
        self.integral = clamp_sym(self.integral, self.slimit);

        // Derivative, only for changes larger than the deadband
        let deriv = match (dt, self.prev_error) {
            (Some(dt), Some(e1)) if (error - e1).abs() > self.dif_deadband => (error - e1) / dt,
            _ => 0.0,
        };

        let out = self.gains.k_p * error + self.gains.k_i * self.integral + self.gains.k_d * deriv;

        self.output = clamp_sym(out, self.olimit);
        self.prev_error = Some(error);
        self.prev_time = Some(now);

        self.output
    }

    fn output(&self) -> f64 {
        self.output
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn gains(k_p: f64, k_i: f64, k_d: f64) -> PidGains {
        PidGains { k_p, k_i, k_d }
    }

    #[test]
    fn test_first_update_is_proportional() {
        let mut pid = PositionalPid::new(gains(0.3, 1.0, 1.0), 100.0);
        pid.set_target(10.0);

        let out = pid.update_at(0.0, Instant::now());
        assert!((out - 3.0).abs() < 1e-12);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_integral_and_derivative() {
        let mut pid = PositionalPid::new(gains(0.0, 1.0, 0.5), 100.0);
        pid.set_target(0.0);

        let t0 = Instant::now();
        pid.update_at(-2.0, t0);

        // Error 4 over 0.5 s
        let out = pid.update_at(-4.0, t0 + Duration::from_millis(500));
        assert!((pid.integral() - 2.0).abs() < 1e-9);

        // I = 2, D = (4 - 2) / 0.5 = 4 -> 1 * 2 + 0.5 * 4
        assert!((out - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dt_uses_epsilon() {
        let mut pid = PositionalPid::new(gains(0.0, 1.0, 0.0), 100.0);
        pid.set_target(5.0);

        let t0 = Instant::now();
        pid.update_at(0.0, t0);
        pid.update_at(0.0, t0);

        assert!((pid.integral() - 5.0 * DT_EPSILON_S).abs() < 1e-12);
    }

    #[test]
    fn test_integral_clamped() {
        let mut pid = PositionalPid::new(gains(0.0, 1.0, 0.0), 2.0);
        pid.set_target(100.0);

        let t0 = Instant::now();
        for i in 0..100 {
            pid.update_at(0.0, t0 + Duration::from_millis(100 * i));
            assert!(pid.integral().abs() <= 2.0);
        }
        assert_eq!(pid.integral(), 2.0);

        // Sign is kept when clamping a negative integral
        pid.reset();
        pid.set_target(-100.0);
        for i in 0..100 {
            pid.update_at(0.0, t0 + Duration::from_millis(100 * i));
        }
        assert_eq!(pid.integral(), -2.0);
    }

    #[test]
    fn test_deadbands() {
        let mut pid = PositionalPid::new(gains(0.0, 1.0, 1.0), 100.0);
        pid.set_limits(1.0, 1.0, 100.0, 100.0);
        pid.set_target(0.0);

        let t0 = Instant::now();
        pid.update_at(-0.5, t0);
        let out = pid.update_at(-0.9, t0 + Duration::from_secs(1));

        // Error inside the integral deadband and change inside the derivative deadband
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(out, 0.0);
    }

    #[test]
    fn test_sample_time_holds_output() {
        let mut pid = PositionalPid::new(gains(1.0, 0.0, 0.0), 100.0);
        pid.set_sample_time(0.1);
        pid.set_target(0.0);

        let t0 = Instant::now();
        assert_eq!(pid.update_at(-5.0, t0), 5.0);
        assert_eq!(pid.update_at(-8.0, t0 + Duration::from_millis(50)), 5.0);
        assert_eq!(pid.update_at(-8.0, t0 + Duration::from_millis(100)), 8.0);
    }

    #[test]
    fn test_reset_keeps_gains() {
        let mut pid = PositionalPid::new(gains(2.0, 1.0, 0.0), 3.0);
        pid.set_target(1.0);

        let t0 = Instant::now();
        pid.update_at(0.0, t0);
        pid.update_at(0.0, t0 + Duration::from_secs(1));
        assert!(pid.integral() > 0.0);

        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.output(), 0.0);

        // Output still limited to 3 and gain still 2
        assert_eq!(pid.update_at(0.0, t0), 2.0);
        assert_eq!(pid.update_at(-10.0, t0 + Duration::from_secs(1)), 3.0);
    }
}
