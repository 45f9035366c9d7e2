bitflags::bitflags! {
    /// Sensor groups the tuning UI can ask to calibrate.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CalibrationRequest: u8 {
        const ACCEL_GYRO = 0x01;
        const MAGNETOMETER = 0x02;
    }
}

/// Hard-iron bias and soft-iron scale for the magnetometer (raw units).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnetometerCalibration {
    pub bias: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for MagnetometerCalibration {
    fn default() -> Self {
        Self {
            bias: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// Persisted sensor offsets. `calibrated` gates whether the values are trusted.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CalibrationRecord {
    pub calibrated: bool,
    pub accel_bias: [f32; 3],
    pub gyro_bias: [f32; 3],
    pub magnetometer: MagnetometerCalibration,
}
