use shared_definitions::controller::ControllerInput;
use shared_definitions::tuning::StickShaping;

use crate::config::constants::{ALTITUDE_STICK_SCALE, TAKEOFF_ALTITUDE_OFFSET_M};
use crate::config::tuning::TuningConfig;
use crate::util::math::angles::{angle_error, wrap_degrees_360};
use crate::util::math::vectors::RotationVector2D;

/// `(1 - e) x + e x³`: odd, flattens the centre, keeps ±1 at full stick.
pub fn expo_curve(x: f32, expo: f32) -> f32 {
    (1.0 - expo) * x + expo * x * x * x
}

/// Normalise by the limit, apply expo and response, scale back, add trim, clamp to the limit.
pub fn shape_axis(raw: f32, shaping: &StickShaping, trim: f32) -> f32 {
    let limit = shaping.limit.abs();
    if limit == 0.0 || !limit.is_finite() || !raw.is_finite() {
        return 0.0;
    }

    let normalized = (raw / limit).max(-1.0).min(1.0);
    let curved = expo_curve(normalized, shaping.expo) * shaping.response;
    (curved * limit + trim).max(-limit).min(limit)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ShapedCommand {
    /// deg
    pub target_roll: f32,
    /// deg
    pub target_pitch: f32,
    /// deg/s
    pub target_yaw_rate: f32,
    /// m/s, before slew limiting
    pub altitude_rate: f32,
}

/// Stick-to-setpoint shaping and the integrated yaw and altitude setpoints.
#[derive(Debug, Default, Clone)]
pub struct CommandShaper {
    yaw_reference: f32,
    yaw_setpoint: f32,
    altitude_rate: f32,
    altitude_baseline: f32,
    altitude_setpoint: f32,
    min_altitude: f32,
    max_altitude: f32,
    last_command: ShapedCommand,
}

impl CommandShaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(
        &self,
        input: &ControllerInput,
        config: &TuningConfig,
        headless: bool,
        current_yaw: f32,
    ) -> ShapedCommand {
        let trims = &config.trims;
        let mut attitude = RotationVector2D {
            roll: shape_axis(input.x_right as f32, &config.roll_pitch_shaping, trims.roll),
            pitch: shape_axis(input.y_right as f32, &config.roll_pitch_shaping, trims.pitch),
        };

        if headless {
            attitude = attitude.rotated(angle_error(current_yaw, self.yaw_reference));
        }

        ShapedCommand {
            target_roll: attitude.roll,
            target_pitch: attitude.pitch,
            target_yaw_rate: shape_axis(input.x_left as f32, &config.yaw_shaping, trims.yaw),
            altitude_rate: shape_axis(
                input.y_left as f32 * ALTITUDE_STICK_SCALE,
                &config.altitude_shaping,
                trims.altitude,
            ),
        }
    }

    /// Shapes the sticks, then integrates the yaw and altitude setpoints over `dt`.
    pub fn update(
        &mut self,
        input: &ControllerInput,
        config: &TuningConfig,
        headless: bool,
        current_yaw: f32,
        dt: f32,
    ) -> ShapedCommand {
        let command = self.shape(input, config, headless, current_yaw);

        self.yaw_setpoint = wrap_degrees_360(self.yaw_setpoint + command.target_yaw_rate * dt);

        let max_change = config.max_rate_change.abs();
        let delta = (command.altitude_rate - self.altitude_rate)
            .max(-max_change)
            .min(max_change);
        self.altitude_rate += delta;

        self.altitude_setpoint = (self.altitude_setpoint + self.altitude_rate * dt)
            .max(self.min_altitude)
            .min(self.max_altitude);

        self.last_command = command;
        command
    }

    /// Arm-time capture: altitude window around the baseline and the headless yaw reference.
    pub fn capture_reference(&mut self, altitude_baseline: f32, range_altitude: f32, current_yaw: f32) {
        let range = range_altitude.abs();
        self.altitude_baseline = altitude_baseline;
        self.min_altitude = altitude_baseline - range;
        self.max_altitude = altitude_baseline + range;
        self.altitude_setpoint = (altitude_baseline + TAKEOFF_ALTITUDE_OFFSET_M)
            .max(self.min_altitude)
            .min(self.max_altitude);
        self.altitude_rate = 0.0;

        self.yaw_reference = current_yaw;
        self.yaw_setpoint = current_yaw;
    }

    pub fn yaw_setpoint(&self) -> f32 {
        self.yaw_setpoint
    }

    pub fn yaw_reference(&self) -> f32 {
        self.yaw_reference
    }

    pub fn altitude_setpoint(&self) -> f32 {
        self.altitude_setpoint
    }

    pub fn altitude_baseline(&self) -> f32 {
        self.altitude_baseline
    }

    pub fn altitude_window(&self) -> (f32, f32) {
        (self.min_altitude, self.max_altitude)
    }

    /// Slew-limited altitude rate (m/s).
    pub fn altitude_rate(&self) -> f32 {
        self.altitude_rate
    }

    pub fn last_command(&self) -> ShapedCommand {
        self.last_command
    }
}
