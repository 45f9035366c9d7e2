use shared_definitions::tuning::PidGains;

use super::integrator::Integrator;

/// Error-based PID stage with a clamped integral and a fixed nominal period.
#[derive(Debug, Clone)]
pub struct PID {
    proportional_multiplier: f32,
    integral_multiplier: f32,
    derivative_multiplier: f32,
    previous_error: f32,
    last_output: f32,
    error_integrator: Integrator,
}

impl PID {
    pub fn new(
        proportional_multiplier: f32,
        integral_multiplier: f32,
        derivative_multiplier: f32,
    ) -> Self {
        PID {
            proportional_multiplier,
            integral_multiplier,
            derivative_multiplier,
            previous_error: 0.0_f32,
            last_output: 0.0_f32,
            error_integrator: Integrator::new(),
        }
    }

    pub fn from_gains(gains: &PidGains) -> Self {
        Self::new(gains.proportional, gains.integral, gains.derivative)
    }

    /// Keeps the accumulated state, only the multipliers change.
    pub fn set_gains(&mut self, gains: &PidGains) {
        self.proportional_multiplier = gains.proportional;
        self.integral_multiplier = gains.integral;
        self.derivative_multiplier = gains.derivative;
    }

    pub fn update(
        &mut self,
        desired_state: f32,
        measured_state: f32,
        iteration_length: f32,
        integral_limit: f32,
    ) -> f32 {
        self.update_with_error(desired_state - measured_state, iteration_length, integral_limit)
    }

    /// `iteration_length` must be the loop's nominal period, never a measured interval.
    pub fn update_with_error(&mut self, error: f32, iteration_length: f32, integral_limit: f32) -> f32 {
        let accumulated_error =
            self.error_integrator
                .add_new_value(error, iteration_length, integral_limit);

        let change_rate = if iteration_length > 0.0 {
            (error - self.previous_error) / iteration_length
        } else {
            0.0
        };
        self.previous_error = error;

        let proportional_output = error * self.proportional_multiplier;
        let integral_output = accumulated_error * self.integral_multiplier;
        let derivative_output = change_rate * self.derivative_multiplier;

        self.last_output = proportional_output + integral_output + derivative_output;
        self.last_output
    }

    pub fn integral(&self) -> f32 {
        self.error_integrator.get_current_value()
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    pub fn reset(&mut self) {
        self.error_integrator.reset();
        self.previous_error = 0.0;
        self.last_output = 0.0;
    }
}
