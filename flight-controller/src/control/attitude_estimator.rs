use libm::{asinf, atan2f, cosf, sinf, sqrtf};

use crate::config::constants::STANDARD_GRAVITY;
use crate::util::math::angles::wrap_degrees_360;
use crate::util::math::vectors::{RotationVector3D, Vector3D};

/// Gradient-descent orientation filter fusing gyro and accelerometer.
#[derive(Clone, Copy, Debug)]
pub struct Madgwick {
    q0: f32,
    q1: f32,
    q2: f32,
    q3: f32,
    beta: f32,
    inv_sample_freq: f32,
}

impl Madgwick {
    pub fn new(beta: f32, sample_freq: f32) -> Self {
        Self {
            q0: 1.0,
            q1: 0.0,
            q2: 0.0,
            q3: 0.0,
            beta,
            inv_sample_freq: 1.0 / sample_freq,
        }
    }

    pub fn reset(&mut self) {
        self.q0 = 1.0;
        self.q1 = 0.0;
        self.q2 = 0.0;
        self.q3 = 0.0;
    }

    /// Gyro in deg/s, accelerometer in any unit (normalised here).
    /// A zero accelerometer vector skips the correction step.
    pub fn update_imu(&mut self, gyro: Vector3D, accel: Vector3D) {
        let (q0, q1, q2, q3) = (self.q0, self.q1, self.q2, self.q3);
        let gx = gyro.x.to_radians();
        let gy = gyro.y.to_radians();
        let gz = gyro.z.to_radians();

        // Quaternion derivative from gyro
        let mut q_dot0 = 0.5 * (-q1 * gx - q2 * gy - q3 * gz);
        let mut q_dot1 = 0.5 * (q0 * gx + q2 * gz - q3 * gy);
        let mut q_dot2 = 0.5 * (q0 * gy - q1 * gz + q3 * gx);
        let mut q_dot3 = 0.5 * (q0 * gz + q1 * gy - q2 * gx);

        let accel_norm = accel.norm();
        if accel_norm > 0.0 && accel_norm.is_finite() {
            let ax = accel.x / accel_norm;
            let ay = accel.y / accel_norm;
            let az = accel.z / accel_norm;

            // Gradient descent corrective step
            let f1 = 2.0 * (q1 * q3 - q0 * q2) - ax;
            let f2 = 2.0 * (q0 * q1 + q2 * q3) - ay;
            let f3 = 2.0 * (0.5 - q1 * q1 - q2 * q2) - az;

            let s0 = -2.0 * q2 * f1 + 2.0 * q1 * f2;
            let s1 = 2.0 * q3 * f1 + 2.0 * q0 * f2 - 4.0 * q1 * f3;
            let s2 = -2.0 * q0 * f1 + 2.0 * q3 * f2 - 4.0 * q2 * f3;
            let s3 = 2.0 * q1 * f1 + 2.0 * q2 * f2;

            // Zero gradient means the estimate already agrees with gravity
            let gradient_norm = sqrtf(s0 * s0 + s1 * s1 + s2 * s2 + s3 * s3);
            if gradient_norm > 0.0 {
                q_dot0 -= self.beta * s0 / gradient_norm;
                q_dot1 -= self.beta * s1 / gradient_norm;
                q_dot2 -= self.beta * s2 / gradient_norm;
                q_dot3 -= self.beta * s3 / gradient_norm;
            }
        }

        let q0 = q0 + q_dot0 * self.inv_sample_freq;
        let q1 = q1 + q_dot1 * self.inv_sample_freq;
        let q2 = q2 + q_dot2 * self.inv_sample_freq;
        let q3 = q3 + q_dot3 * self.inv_sample_freq;

        let norm = sqrtf(q0 * q0 + q1 * q1 + q2 * q2 + q3 * q3);
        if norm > 0.0 && norm.is_finite() {
            self.q0 = q0 / norm;
            self.q1 = q1 / norm;
            self.q2 = q2 / norm;
            self.q3 = q3 / norm;
        }
    }

    /// Filter-frame Euler angles in degrees, yaw in [0, 360].
    pub fn euler_angles(&self) -> RotationVector3D {
        let (q0, q1, q2, q3) = (self.q0, self.q1, self.q2, self.q3);
        let roll = atan2f(q0 * q1 + q2 * q3, 0.5 - q1 * q1 - q2 * q2);
        let pitch = asinf((-2.0 * (q1 * q3 - q0 * q2)).clamp(-1.0, 1.0));
        let yaw = atan2f(q1 * q2 + q0 * q3, 0.5 - q2 * q2 - q3 * q3);
        RotationVector3D {
            roll: roll.to_degrees(),
            pitch: pitch.to_degrees(),
            yaw: yaw.to_degrees() + 180.0,
        }
    }
}

/// Vehicle attitude in the control convention: roll inverted, yaw as a [0, 360) heading.
#[derive(Clone, Debug)]
pub struct AttitudeEstimator {
    filter: Madgwick,
    filter_frame: RotationVector3D,
    attitude: RotationVector3D,
}

impl AttitudeEstimator {
    pub fn new(beta: f32, sample_freq: f32) -> Self {
        let filter = Madgwick::new(beta, sample_freq);
        let filter_frame = filter.euler_angles();
        Self {
            filter,
            filter_frame,
            attitude: Self::to_control_frame(filter_frame),
        }
    }

    pub fn update(&mut self, gyro: Vector3D, accel: Vector3D) -> RotationVector3D {
        self.filter.update_imu(gyro, accel);
        self.filter_frame = self.filter.euler_angles();
        self.attitude = Self::to_control_frame(self.filter_frame);
        self.attitude
    }

    pub fn attitude(&self) -> RotationVector3D {
        self.attitude
    }

    /// Angles as the filter reports them, used for the world-frame projection.
    pub fn filter_frame(&self) -> RotationVector3D {
        self.filter_frame
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.filter_frame = self.filter.euler_angles();
        self.attitude = Self::to_control_frame(self.filter_frame);
    }

    fn to_control_frame(filter_frame: RotationVector3D) -> RotationVector3D {
        RotationVector3D {
            roll: -filter_frame.roll,
            pitch: filter_frame.pitch,
            yaw: wrap_degrees_360(360.0 - filter_frame.yaw),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AltitudeEstimate {
    /// m
    pub altitude: f32,
    /// m/s, positive up
    pub vertical_velocity: f32,
}

/// Fuses integrated vertical acceleration with the barometer through two complementary filters.
#[derive(Clone, Debug)]
pub struct AltitudeEstimator {
    estimate: AltitudeEstimate,
    previous_baro: Option<f32>,
    alpha: f32,
    beta: f32,
}

impl AltitudeEstimator {
    pub fn new(alpha: f32, beta: f32) -> Self {
        Self {
            estimate: AltitudeEstimate::default(),
            previous_baro: None,
            alpha: alpha.clamp(0.0, 1.0),
            beta: beta.clamp(0.0, 1.0),
        }
    }

    pub fn set_weights(&mut self, alpha: f32, beta: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
        self.beta = beta.clamp(0.0, 1.0);
    }

    /// Gravity-free vertical acceleration in m/s², from body accel (g) and filter-frame roll/pitch (deg).
    pub fn vertical_acceleration(accel: Vector3D, filter_frame: RotationVector3D) -> f32 {
        let accel = accel * STANDARD_GRAVITY;
        let roll = filter_frame.roll.to_radians();
        let pitch = filter_frame.pitch.to_radians();
        let world_z = -accel.x * sinf(pitch)
            + accel.y * sinf(roll) * cosf(pitch)
            + accel.z * cosf(roll) * cosf(pitch);
        world_z - STANDARD_GRAVITY
    }

    pub fn update(&mut self, vertical_acceleration: f32, baro_altitude: f32, dt: f32) -> AltitudeEstimate {
        if dt <= 0.0 || !baro_altitude.is_finite() || !vertical_acceleration.is_finite() {
            return self.estimate;
        }

        // The first barometer sample seeds the estimate, no derivative spike
        let previous_baro = match self.previous_baro {
            Some(previous) => previous,
            None => {
                self.estimate.altitude = baro_altitude;
                baro_altitude
            }
        };

        let mut velocity = self.estimate.vertical_velocity + vertical_acceleration * dt;
        let mut altitude = self.estimate.altitude + velocity * dt;

        altitude = self.alpha * altitude + (1.0 - self.alpha) * baro_altitude;

        let baro_velocity = (baro_altitude - previous_baro) / dt;
        velocity = self.beta * velocity + (1.0 - self.beta) * baro_velocity;

        self.previous_baro = Some(baro_altitude);
        self.estimate = AltitudeEstimate {
            altitude,
            vertical_velocity: velocity,
        };
        self.estimate
    }

    /// Writes back the conditioned vertical velocity, it feeds the next integration step.
    pub fn set_vertical_velocity(&mut self, velocity: f32) {
        self.estimate.vertical_velocity = velocity;
    }

    pub fn estimate(&self) -> AltitudeEstimate {
        self.estimate
    }

    pub fn reset(&mut self) {
        self.estimate = AltitudeEstimate::default();
        self.previous_baro = None;
    }
}
