//! # Servo Controller Module
//!
//! This module drives pan/tilt angle servos directly from the PID outputs, as an alternative to
//! sending demand packets to an external servo board. Each [`ServoChannel`] accumulates the PID
//! output into its demanded angle and writes the matching duty cycle through a [`ServoDriver`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`ServoDriver`] implementation for the Raspberry Pi hardware PWM channels.
pub mod rpi_pwm;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};
use util::maths::lin_map;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// PWM frequency for hobby servos.
///
/// Units: hertz
pub const SERVO_PWM_FREQ_HZ: f64 = 50.0;

/// Duty cycle at the minimum angle.
pub const SERVO_MIN_DUTY: f64 = 0.025;

/// Duty cycle at the maximum angle.
pub const SERVO_MAX_DUTY: f64 = 0.125;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for accessing servo driver boards.
pub trait ServoDriver {

    /// The type that the underlying driver uses for channel identification
    type Channel;

    /// Set the duty cycle of a channel.
    ///
    /// ## Arguments
    /// - `channel` - The channel to set the duty cycle for
    /// - `duty_cycle` - The duty cycle to set. Must be a value between 0.0 and 1.0. Values outside
    ///   this range will be rejected.
    fn set_duty_cycle(&mut self, channel: Self::Channel, duty_cycle: f64) -> Result<(), ServoError>;

    /// Stop driving a channel.
    fn disable(&mut self, channel: Self::Channel) -> Result<(), ServoError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Configuration of one servo channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServoChannelParams {
    /// The type of servo on this channel.
    pub kind: ServoKind,

    /// The driver channel the servo is connected to.
    pub channel: u32,

    /// Angle commanded at startup, defaults to the servo type's start angle.
    ///
    /// Units: degrees
    #[serde(default)]
    pub start_angle_deg: Option<f64>,

    /// Allowed angle range, defaults to the servo type's limits.
    ///
    /// Units: degrees
    #[serde(default)]
    pub limits_deg: Option<(f64, f64)>,
}

/// A single angle servo.
#[derive(Debug, Clone)]
pub struct ServoChannel<C> {
    kind: ServoKind,
    channel: C,

    /// Current demanded angle in degrees
    angle_deg: f64,

    min_angle_deg: f64,
    max_angle_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ServoError {
    #[error("Duty cycle must be between 0.0 and 1.0, got {0}")]
    InvalidDutyCycle(f64),

    #[error("Channel {0} has not been set up")]
    UnknownChannel(u32),

    #[error("Channel {0} is used by more than one servo")]
    ChannelInUse(u32),

    #[error("PWM error: {0}")]
    Pwm(#[from] rppal::pwm::Error),
}

/// The supported servo types.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServoKind {
    /// 180 degree servo
    Deg180,

    /// 270 degree servo
    Deg270,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoKind {
    /// Full mechanical range in degrees.
    pub fn range_deg(&self) -> f64 {
        match self {
            ServoKind::Deg180 => 180.0,
            ServoKind::Deg270 => 270.0,
        }
    }

    /// Default allowed angle range in degrees.
    pub fn default_limits_deg(&self) -> (f64, f64) {
        match self {
            ServoKind::Deg180 => (10.0, 180.0),
            ServoKind::Deg270 => (60.0, 210.0),
        }
    }

    /// Default angle at startup in degrees.
    pub fn default_start_deg(&self) -> f64 {
        match self {
            ServoKind::Deg180 => 110.0,
            ServoKind::Deg270 => 135.0,
        }
    }

    /// Convert an angle into a duty cycle, mapping `[0, range]` onto `[2.5 %, 12.5 %]`.
    pub fn angle_to_duty(&self, angle_deg: f64) -> f64 {
        lin_map(
            (0.0, self.range_deg()),
            (SERVO_MIN_DUTY, SERVO_MAX_DUTY),
            angle_deg
        )
    }
}

impl<C: Copy> ServoChannel<C> {
    /// Create a new channel with the type's default limits, demanding `start_angle_deg`.
    ///
    /// Nothing is written to the driver until the first call to `set_angle`.
    pub fn new(kind: ServoKind, channel: C) -> Self {
        let (min_angle_deg, max_angle_deg) = kind.default_limits_deg();

        Self {
            kind,
            channel,
            angle_deg: kind.default_start_deg(),
            min_angle_deg,
            max_angle_deg,
        }
    }

    /// Create a new channel from its parameters, using `channel` as the driver's channel.
    pub fn from_params(params: &ServoChannelParams, channel: C) -> Self {
        let mut servo = Self::new(params.kind, channel);

        if let Some((min, max)) = params.limits_deg {
            servo.min_angle_deg = min.min(max);
            servo.max_angle_deg = max.max(min);
        }
        if let Some(start) = params.start_angle_deg {
            servo.angle_deg = start;
        }
        servo.angle_deg = servo.clamp(servo.angle_deg);

        servo
    }

    /// The current demanded angle.
    pub fn angle_deg(&self) -> f64 {
        self.angle_deg
    }

    /// Command the servo to an angle, clamped to the limits. Returns the commanded angle.
    pub fn set_angle<D>(&mut self, driver: &mut D, angle_deg: f64) -> Result<f64, ServoError>
    where
        D: ServoDriver<Channel = C>
    {
        let angle_deg = self.clamp(angle_deg);

        driver.set_duty_cycle(self.channel, self.kind.angle_to_duty(angle_deg))?;
        self.angle_deg = angle_deg;

        Ok(angle_deg)
    }

    /// Step the servo by a PID output, `angle -= output`.
    pub fn apply_pid_output<D>(&mut self, driver: &mut D, output: f64) -> Result<f64, ServoError>
    where
        D: ServoDriver<Channel = C>
    {
        let target = self.angle_deg - output;

        trace!("Servo {:?}: {:.2} - {:.3} deg", self.kind, self.angle_deg, output);

        self.set_angle(driver, target)
    }

    /// Write the current demanded angle, used to move to the start position.
    pub fn hold<D>(&mut self, driver: &mut D) -> Result<f64, ServoError>
    where
        D: ServoDriver<Channel = C>
    {
        self.set_angle(driver, self.angle_deg)
    }

    fn clamp(&self, angle_deg: f64) -> f64 {
        if angle_deg.is_nan() {
            return self.angle_deg;
        }
        angle_deg.max(self.min_angle_deg).min(self.max_angle_deg)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingDriver {
        duties: HashMap<u32, f64>,
    }

    impl ServoDriver for RecordingDriver {
        type Channel = u32;

        fn set_duty_cycle(&mut self, channel: u32, duty_cycle: f64) -> Result<(), ServoError> {
            if !(0.0..=1.0).contains(&duty_cycle) {
                return Err(ServoError::InvalidDutyCycle(duty_cycle));
            }
            self.duties.insert(channel, duty_cycle);
            Ok(())
        }

        fn disable(&mut self, channel: u32) -> Result<(), ServoError> {
            self.duties.remove(&channel);
            Ok(())
        }
    }

    #[test]
    fn test_angle_to_duty() {
        assert!((ServoKind::Deg180.angle_to_duty(0.0) - 0.025).abs() < 1e-12);
        assert!((ServoKind::Deg180.angle_to_duty(90.0) - 0.075).abs() < 1e-12);
        assert!((ServoKind::Deg270.angle_to_duty(270.0) - 0.125).abs() < 1e-12);
        assert!((ServoKind::Deg270.angle_to_duty(135.0) - 0.075).abs() < 1e-12);
    }

    #[test]
    fn test_set_angle_clamped() {
        let mut driver = RecordingDriver::default();
        let mut servo = ServoChannel::new(ServoKind::Deg180, 7u32);
        assert_eq!(servo.angle_deg(), 110.0);

        assert_eq!(servo.set_angle(&mut driver, 0.0).unwrap(), 10.0);
        assert_eq!(servo.set_angle(&mut driver, 250.0).unwrap(), 180.0);
        assert!((driver.duties[&7] - 0.125).abs() < 1e-12);

        let mut servo = ServoChannel::new(ServoKind::Deg270, 6u32);
        assert_eq!(servo.set_angle(&mut driver, 30.0).unwrap(), 60.0);
        assert_eq!(servo.set_angle(&mut driver, 240.0).unwrap(), 210.0);
    }

    #[test]
    fn test_apply_pid_output() {
        let mut driver = RecordingDriver::default();
        let mut servo = ServoChannel::new(ServoKind::Deg270, 6u32);

        assert_eq!(servo.apply_pid_output(&mut driver, 5.0).unwrap(), 130.0);
        assert_eq!(servo.apply_pid_output(&mut driver, -10.0).unwrap(), 140.0);

        // Accumulation stops at the limit
        for _ in 0..100 {
            servo.apply_pid_output(&mut driver, 10.0).unwrap();
        }
        assert_eq!(servo.angle_deg(), 60.0);
    }

    #[test]
    fn test_from_params() {
        let params = ServoChannelParams {
            kind: ServoKind::Deg180,
            channel: 7,
            start_angle_deg: Some(500.0),
            limits_deg: Some((120.0, 30.0)),
        };
        let servo = ServoChannel::from_params(&params, params.channel);

        assert_eq!(servo.angle_deg(), 120.0);
    }
}
