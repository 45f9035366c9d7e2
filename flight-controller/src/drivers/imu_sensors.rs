use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use shared_definitions::calibration::MagnetometerCalibration;

use crate::config::constants::{
    ACCEL_GYRO_CALIBRATION_INTERVAL_US, ACCEL_GYRO_CALIBRATION_SAMPLES, MAG_CALIBRATION_INTERVAL_US,
    MAG_CALIBRATION_SAMPLES, MAG_CALIBRATION_SETTLE_US,
};
use crate::util::math::vectors::Vector3D;

/// One reading of the 9-axis IMU.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// g
    pub accel: Vector3D,
    /// deg/s
    pub gyro: Vector3D,
    /// raw counts
    pub mag: Vector3D,
}

/// Offsets subtracted from raw readings before they reach the filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorOffsets {
    pub accel_bias: Vector3D,
    pub gyro_bias: Vector3D,
    pub mag_bias: Vector3D,
    /// Stored for the UI, not applied by the loop.
    pub mag_scale: Vector3D,
}

impl Default for SensorOffsets {
    fn default() -> Self {
        Self {
            accel_bias: Vector3D::default(),
            gyro_bias: Vector3D::default(),
            mag_bias: Vector3D::default(),
            mag_scale: Vector3D::new(1.0, 1.0, 1.0),
        }
    }
}

impl SensorOffsets {
    pub fn apply(&self, raw: ImuSample) -> ImuSample {
        ImuSample {
            accel: raw.accel - self.accel_bias,
            gyro: raw.gyro - self.gyro_bias,
            mag: raw.mag - self.mag_bias,
        }
    }
}

pub trait ImuSensor {
    type Error: Debug;

    fn init(&mut self) -> Result<(), Self::Error>;
    fn read_raw(&mut self) -> Result<ImuSample, Self::Error>;

    ///To run this the IMU must be level and completely still.
    /// Returns (accel bias, gyro bias); gravity is removed from the z axis.
    fn calculate_accel_gyro_bias<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<(Vector3D, Vector3D), Self::Error> {
        let mut accel_accumulator = Vector3D::default();
        let mut gyro_accumulator = Vector3D::default();
        for _ in 0..ACCEL_GYRO_CALIBRATION_SAMPLES {
            let sample = self.read_raw()?;
            accel_accumulator += sample.accel;
            gyro_accumulator += sample.gyro;
            delay.delay_us(ACCEL_GYRO_CALIBRATION_INTERVAL_US);
        }
        let count = ACCEL_GYRO_CALIBRATION_SAMPLES.max(1) as f32;
        let mut accel_bias = accel_accumulator / count;
        accel_bias.z -= 1.0;
        Ok((accel_bias, gyro_accumulator / count))
    }

    ///To run this the IMU has to be rotated through every orientation.
    fn calculate_magnetometer_calibration<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<MagnetometerCalibration, Self::Error> {
        delay.delay_us(MAG_CALIBRATION_SETTLE_US);

        let mut min = Vector3D::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vector3D::new(f32::MIN, f32::MIN, f32::MIN);
        for _ in 0..MAG_CALIBRATION_SAMPLES {
            let mag = self.read_raw()?.mag;
            min = min.component_min(mag);
            max = max.component_max(mag);
            delay.delay_us(MAG_CALIBRATION_INTERVAL_US);
        }

        Ok(MagnetometerCalibration {
            bias: ((max + min) / 2.0).to_array(),
            scale: ((max - min) / 2.0).to_array(),
        })
    }
}
