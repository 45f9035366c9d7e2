use shared_definitions::tuning::AxisPidGains;

use super::pid::PID;
use crate::config::tuning::AxisValues;
use crate::util::math::angles::angle_error;
use crate::util::math::vectors::RotationVector3D;

/// Setpoints for the outer loop.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AngleModeControllerInput {
    /// roll and pitch in degrees, yaw as a [0, 360) heading
    pub desired_rotation: RotationVector3D,
    pub measured_rotation: RotationVector3D,
    pub desired_altitude: f32,
    pub measured_altitude: f32,
    pub iteration_time: f32,
}

/// Outer loop demand handed to the inner loop.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RateSetpoints {
    /// deg/s
    pub rotation_rate: RotationVector3D,
    /// m/s
    pub vertical_velocity: f32,
}

/// Outer loop, 100 Hz: angle and altitude errors to rate setpoints.
#[derive(Debug, Clone)]
pub struct AngleModeFlightController {
    roll_pid: PID,
    pitch_pid: PID,
    yaw_pid: PID,
    altitude_pid: PID,
    last_output: RateSetpoints,
}

impl AngleModeFlightController {
    pub fn new(gains: &AxisPidGains) -> Self {
        Self {
            roll_pid: PID::from_gains(&gains.roll),
            pitch_pid: PID::from_gains(&gains.pitch),
            yaw_pid: PID::from_gains(&gains.yaw),
            altitude_pid: PID::from_gains(&gains.altitude),
            last_output: RateSetpoints::default(),
        }
    }

    pub fn set_pid_tune(&mut self, gains: &AxisPidGains) {
        self.roll_pid.set_gains(&gains.roll);
        self.pitch_pid.set_gains(&gains.pitch);
        self.yaw_pid.set_gains(&gains.yaw);
        self.altitude_pid.set_gains(&gains.altitude);
    }

    pub fn get_next_output(
        &mut self,
        input: AngleModeControllerInput,
        integral_limit: f32,
    ) -> RateSetpoints {
        let roll_rate = self.roll_pid.update(
            input.desired_rotation.roll,
            input.measured_rotation.roll,
            input.iteration_time,
            integral_limit,
        );
        let pitch_rate = self.pitch_pid.update(
            input.desired_rotation.pitch,
            input.measured_rotation.pitch,
            input.iteration_time,
            integral_limit,
        );
        let yaw_rate = self.yaw_pid.update_with_error(
            angle_error(input.desired_rotation.yaw, input.measured_rotation.yaw),
            input.iteration_time,
            integral_limit,
        );
        let vertical_velocity = self.altitude_pid.update(
            input.desired_altitude,
            input.measured_altitude,
            input.iteration_time,
            integral_limit,
        );

        self.last_output = RateSetpoints {
            rotation_rate: RotationVector3D::new(roll_rate, pitch_rate, yaw_rate),
            vertical_velocity,
        };
        self.last_output
    }

    pub fn last_output(&self) -> RateSetpoints {
        self.last_output
    }

    pub fn reset(&mut self) {
        self.roll_pid.reset();
        self.pitch_pid.reset();
        self.yaw_pid.reset();
        self.altitude_pid.reset();
        self.last_output = RateSetpoints::default();
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RotationRateControllerInput {
    pub desired: RateSetpoints,
    /// deg/s in the control convention
    pub measured_rotation_rate: RotationVector3D,
    pub measured_vertical_velocity: f32,
    pub iteration_time: f32,
}

/// Corrective torques and collective thrust, in motor duty units.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FlightStabilizerOut {
    pub rotation_output_command: RotationVector3D,
    pub altitude_output: f32,
}

/// Inner loop, 400 Hz: rate errors to motor corrections plus feed-forward of the outer demand.
#[derive(Debug, Clone)]
pub struct RotationRateFlightController {
    roll_pid: PID,
    pitch_pid: PID,
    yaw_pid: PID,
    altitude_pid: PID,
    feed_forward: AxisValues,
    last_output: FlightStabilizerOut,
}

impl RotationRateFlightController {
    pub fn new(gains: &AxisPidGains, feed_forward: AxisValues) -> Self {
        Self {
            roll_pid: PID::from_gains(&gains.roll),
            pitch_pid: PID::from_gains(&gains.pitch),
            yaw_pid: PID::from_gains(&gains.yaw),
            altitude_pid: PID::from_gains(&gains.altitude),
            feed_forward,
            last_output: FlightStabilizerOut::default(),
        }
    }

    pub fn set_pid_tune(&mut self, gains: &AxisPidGains, feed_forward: AxisValues) {
        self.roll_pid.set_gains(&gains.roll);
        self.pitch_pid.set_gains(&gains.pitch);
        self.yaw_pid.set_gains(&gains.yaw);
        self.altitude_pid.set_gains(&gains.altitude);
        self.feed_forward = feed_forward;
    }

    pub fn get_next_output(
        &mut self,
        input: RotationRateControllerInput,
        integral_limit: f32,
    ) -> FlightStabilizerOut {
        let desired = input.desired;
        let measured = input.measured_rotation_rate;

        let roll_output = self.roll_pid.update(
            desired.rotation_rate.roll,
            measured.roll,
            input.iteration_time,
            integral_limit,
        ) + self.feed_forward.roll * desired.rotation_rate.roll;
        let pitch_output = self.pitch_pid.update(
            desired.rotation_rate.pitch,
            measured.pitch,
            input.iteration_time,
            integral_limit,
        ) + self.feed_forward.pitch * desired.rotation_rate.pitch;
        let yaw_output = self.yaw_pid.update(
            desired.rotation_rate.yaw,
            measured.yaw,
            input.iteration_time,
            integral_limit,
        ) + self.feed_forward.yaw * desired.rotation_rate.yaw;
        let altitude_output = self.altitude_pid.update(
            desired.vertical_velocity,
            input.measured_vertical_velocity,
            input.iteration_time,
            integral_limit,
        ) + self.feed_forward.altitude * desired.vertical_velocity;

        self.last_output = FlightStabilizerOut {
            rotation_output_command: RotationVector3D::new(roll_output, pitch_output, yaw_output),
            altitude_output,
        };
        self.last_output
    }

    pub fn last_output(&self) -> FlightStabilizerOut {
        self.last_output
    }

    pub fn reset(&mut self) {
        self.roll_pid.reset();
        self.pitch_pid.reset();
        self.yaw_pid.reset();
        self.altitude_pid.reset();
        self.last_output = FlightStabilizerOut::default();
    }
}
