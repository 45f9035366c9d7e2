use core::fmt::Debug;

use crate::config::constants::{MAX_MOTOR_DUTY, MIN_MOTOR_DUTY};

/// PWM sink for the four ESC channels. Duty is in driver counts, `0..=1023`.
pub trait MotorDriver {
    type Error: Debug;

    fn set_duty(&mut self, channel: usize, duty: u16) -> Result<(), Self::Error>;
}

/// Truncates a mixer output to a duty, clamped to the driver range. NaN maps to the minimum.
pub fn duty_from_power(power: f32) -> u16 {
    if power.is_nan() {
        return MIN_MOTOR_DUTY;
    }
    power
        .max(MIN_MOTOR_DUTY as f32)
        .min(MAX_MOTOR_DUTY as f32) as u16
}
