use super::motor_controller::{duty_from_power, MotorDriver};
use crate::util::error::AppError;

pub const MOTOR_COUNT: usize = 4;

/// Owns the motor driver and remembers the last duty sent to each channel.
pub struct QuadcopterMotorsStateManager<M: MotorDriver> {
    driver: M,
    last_duties: [u16; MOTOR_COUNT],
}

impl<M: MotorDriver> QuadcopterMotorsStateManager<M> {
    pub fn new(driver: M) -> Self {
        QuadcopterMotorsStateManager {
            driver,
            last_duties: [0; MOTOR_COUNT],
        }
    }

    pub fn set_motor_power(&mut self, values: [f32; MOTOR_COUNT]) -> Result<(), AppError<M::Error>> {
        self.set_motor_duties(values.map(duty_from_power))
    }

    /// Every channel is attempted even after a fault; the first error is returned.
    pub fn set_motor_duties(&mut self, duties: [u16; MOTOR_COUNT]) -> Result<(), AppError<M::Error>> {
        let mut first_error = None;
        for (channel, duty) in duties.into_iter().enumerate() {
            match self.driver.set_duty(channel, duty) {
                Ok(()) => self.last_duties[channel] = duty,
                Err(error) => {
                    first_error.get_or_insert(AppError {
                        message: "Failed to set motor duty",
                        error,
                    });
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Same duty on every motor, used for the armed-on-ground idle spin.
    pub fn idle(&mut self, duty: u16) -> Result<(), AppError<M::Error>> {
        self.set_motor_duties([duty; MOTOR_COUNT])
    }

    pub fn kill_motors(&mut self) -> Result<(), AppError<M::Error>> {
        let was_running = self.last_duties.iter().any(|duty| *duty != 0);
        self.set_motor_duties([0; MOTOR_COUNT])?;
        if was_running {
            log::info!("Killed motors");
        }
        Ok(())
    }

    pub fn last_duties(&self) -> [u16; MOTOR_COUNT] {
        self.last_duties
    }

    pub fn driver(&self) -> &M {
        &self.driver
    }
}
