use core::ops::Add;

use crate::util::math::vectors::RotationVector3D;

pub trait FlyingVehicleMovementMapper<TActuator> {
    fn map_controller_output_to_actuators_input(
        &self,
        throttle: f32,
        rotation_input: RotationVector3D,
    ) -> TActuator;
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct QuadcopterActuatorsValues {
    pub motor_1: f32,
    pub motor_2: f32,
    pub motor_3: f32,
    pub motor_4: f32,
}

impl From<f32> for QuadcopterActuatorsValues {
    fn from(value: f32) -> Self {
        Self {
            motor_1: value,
            motor_2: value,
            motor_3: value,
            motor_4: value,
        }
    }
}

impl Add for QuadcopterActuatorsValues {
    type Output = QuadcopterActuatorsValues;

    fn add(self, other: Self) -> Self::Output {
        Self {
            motor_1: self.motor_1 + other.motor_1,
            motor_2: self.motor_2 + other.motor_2,
            motor_3: self.motor_3 + other.motor_3,
            motor_4: self.motor_4 + other.motor_4,
        }
    }
}

impl QuadcopterActuatorsValues {
    fn constraint_value(value: f32, min: f32, max: f32) -> f32 {
        if value > max {
            return max;
        }
        if value < min || value.is_nan() {
            return min;
        }
        value
    }

    pub fn get_constrained_to_range(&self, min: f32, max: f32) -> Self {
        Self {
            motor_1: Self::constraint_value(self.motor_1, min, max),
            motor_2: Self::constraint_value(self.motor_2, min, max),
            motor_3: Self::constraint_value(self.motor_3, min, max),
            motor_4: Self::constraint_value(self.motor_4, min, max),
        }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.motor_1, self.motor_2, self.motor_3, self.motor_4]
    }
}

/// X-frame mixer. Throttle is the base speed plus the collective altitude correction.
pub struct Quadcopter {
    motor_min_power: f32,
    motor_max_power: f32,
}

impl Quadcopter {
    pub fn new(motor_min_power: f32, motor_max_power: f32) -> Self {
        Self {
            motor_min_power,
            motor_max_power,
        }
    }

    fn map_roll_to_motor_input(&self, roll_value: f32) -> QuadcopterActuatorsValues {
        QuadcopterActuatorsValues {
            motor_1: roll_value,
            motor_2: -roll_value,
            motor_3: -roll_value,
            motor_4: roll_value,
        }
    }

    fn map_pitch_to_motor_input(&self, pitch_value: f32) -> QuadcopterActuatorsValues {
        QuadcopterActuatorsValues {
            motor_1: pitch_value,
            motor_2: pitch_value,
            motor_3: -pitch_value,
            motor_4: -pitch_value,
        }
    }

    fn map_yaw_to_motor_input(&self, yaw_value: f32) -> QuadcopterActuatorsValues {
        QuadcopterActuatorsValues {
            motor_1: -yaw_value,
            motor_2: yaw_value,
            motor_3: -yaw_value,
            motor_4: yaw_value,
        }
    }
}

impl FlyingVehicleMovementMapper<QuadcopterActuatorsValues> for Quadcopter {
    fn map_controller_output_to_actuators_input(
        &self,
        throttle: f32,
        rotation_input: RotationVector3D,
    ) -> QuadcopterActuatorsValues {
        let motors_throttle = QuadcopterActuatorsValues::from(throttle);
        let pitch_input = self.map_pitch_to_motor_input(rotation_input.pitch);
        let roll_input = self.map_roll_to_motor_input(rotation_input.roll);
        let yaw_input = self.map_yaw_to_motor_input(rotation_input.yaw);
        let combined_output = motors_throttle + pitch_input + roll_input + yaw_input;
        combined_output.get_constrained_to_range(self.motor_min_power, self.motor_max_power)
    }
}

/// True when roll or pitch is beyond `limit_deg`. NaN attitude counts as beyond.
pub fn exceeds_tilt_limit(attitude: &RotationVector3D, limit_deg: f32) -> bool {
    !(attitude.roll.abs() <= limit_deg && attitude.pitch.abs() <= limit_deg)
}
