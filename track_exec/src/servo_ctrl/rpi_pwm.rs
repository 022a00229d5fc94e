//! [`ServoDriver`] implementation for the Raspberry Pi hardware PWM channels

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use rppal::pwm::{Channel, Polarity, Pwm};

use super::{ServoDriver, ServoError, SERVO_MIN_DUTY, SERVO_PWM_FREQ_HZ};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The hardware PWM outputs used for the servos.
///
/// Outputs are created disabled and enabled by the first duty cycle written to them, so the servos
/// don't move until they are commanded. They are disabled and unexported when dropped.
pub struct RpiPwm {
    outputs: Vec<(u32, Pwm)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RpiPwm {
    /// Set up the given hardware PWM channels for servo control.
    pub fn open(channels: &[u32]) -> Result<Self, ServoError> {
        // Check every channel before touching the hardware
        let mut hw_channels: Vec<(u32, Channel)> = Vec::with_capacity(channels.len());
        for c in channels {
            if hw_channels.iter().any(|(n, _)| n == c) {
                return Err(ServoError::ChannelInUse(*c));
            }
            hw_channels.push((*c, hw_channel(*c)?));
        }

        let mut outputs = Vec::with_capacity(hw_channels.len());

        for (num, channel) in hw_channels {
            let pwm = Pwm::with_frequency(
                channel,
                SERVO_PWM_FREQ_HZ,
                SERVO_MIN_DUTY,
                Polarity::Normal,
                false
            )?;

            debug!("PWM channel {} set up at {} Hz", num, SERVO_PWM_FREQ_HZ);
            outputs.push((num, pwm));
        }

        Ok(Self { outputs })
    }

    fn output(&self, channel: u32) -> Result<&Pwm, ServoError> {
        self.outputs
            .iter()
            .find(|(n, _)| *n == channel)
            .map(|(_, p)| p)
            .ok_or(ServoError::UnknownChannel(channel))
    }
}

impl ServoDriver for RpiPwm {
    type Channel = u32;

    fn set_duty_cycle(&mut self, channel: u32, duty_cycle: f64) -> Result<(), ServoError> {
        // If the duty cycle is out of range return an error
        if !(0.0..=1.0).contains(&duty_cycle) {
            return Err(ServoError::InvalidDutyCycle(duty_cycle));
        }

        let pwm = self.output(channel)?;

        pwm.set_duty_cycle(duty_cycle)?;

        if !pwm.is_enabled()? {
            pwm.enable()?;
        }

        Ok(())
    }

    fn disable(&mut self, channel: u32) -> Result<(), ServoError> {
        self.output(channel)?.disable()?;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// The hardware PWM channel for a configured channel number.
pub fn hw_channel(channel: u32) -> Result<Channel, ServoError> {
    match channel {
        0 => Ok(Channel::Pwm0),
        1 => Ok(Channel::Pwm1),
        c => Err(ServoError::UnknownChannel(c)),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hw_channel() {
        assert_eq!(hw_channel(0).unwrap(), Channel::Pwm0);
        assert_eq!(hw_channel(1).unwrap(), Channel::Pwm1);
        assert!(matches!(hw_channel(2), Err(ServoError::UnknownChannel(2))));
    }

    #[test]
    fn test_open_rejects_bad_channels() {
        // Both are refused before any PWM output is touched
        assert!(matches!(
            RpiPwm::open(&[0, 6]),
            Err(ServoError::UnknownChannel(6))
        ));
        assert!(matches!(
            RpiPwm::open(&[1, 1]),
            Err(ServoError::ChannelInUse(1))
        ));
    }
}
