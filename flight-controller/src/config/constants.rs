// Loop rates
pub const INNER_LOOP_FREQUENCY_HZ: u32 = 400;
pub const OUTER_LOOP_FREQUENCY_HZ: u32 = 100;
pub const BAROMETER_FREQUENCY_HZ: u32 = 50;
pub const TELEMETRY_LOG_FREQUENCY_HZ: u32 = 4;

// Nominal loop periods, the PID derivative always divides by these
pub const INNER_LOOP_DT_S: f32 = 1.0 / INNER_LOOP_FREQUENCY_HZ as f32;
pub const OUTER_LOOP_DT_S: f32 = 1.0 / OUTER_LOOP_FREQUENCY_HZ as f32;

//Motors, duty range of the PWM driver
pub const MIN_MOTOR_DUTY: u16 = 0;
pub const MAX_MOTOR_DUTY: u16 = 1023;
pub const ARMED_IDLE_MOTOR_DUTY: u16 = 100;

//Drone limits
pub const TILT_CUTOFF_DEG: f32 = 70.0;
pub const TAKEOFF_ALTITUDE_OFFSET_M: f32 = 1.0;
pub const STANDARD_GRAVITY: f32 = 9.80665;

// Switch handling
pub const HEADLESS_LONG_PRESS_US: u64 = 3_000_000;
pub const LINK_LOSS_TIMEOUT_US: u64 = 1_000_000;
pub const SENSOR_FAULT_LOG_INTERVAL_US: u64 = 1_000_000;

// Stick units: the altitude axis arrives in cm/s
pub const ALTITUDE_STICK_SCALE: f32 = 0.01;

// Signal conditioning, median window sizes and EMA weights
pub const GYRO_MEDIAN_WINDOW: usize = 9;
pub const ACCEL_MEDIAN_WINDOW: usize = 9;
pub const MAG_MEDIAN_WINDOW: usize = 3;
pub const ALTITUDE_MEDIAN_WINDOW: usize = 7;
pub const VERTICAL_VELOCITY_MEDIAN_WINDOW: usize = 5;

pub const GYRO_EMA_ALPHA: f32 = 0.8;
pub const ACCEL_EMA_ALPHA: f32 = 0.7;
pub const MAG_EMA_ALPHA: f32 = 0.9;
pub const ALTITUDE_EMA_ALPHA: f32 = 0.5;
pub const VERTICAL_VELOCITY_EMA_ALPHA: f32 = 0.6;

// Attitude estimator
pub const MADGWICK_BETA: f32 = 0.1;

// Sensor calibration, bounded blocking routines run only on the ground
pub const ACCEL_GYRO_CALIBRATION_SAMPLES: u32 = 500;
pub const ACCEL_GYRO_CALIBRATION_INTERVAL_US: u32 = 2_000;
pub const MAG_CALIBRATION_SAMPLES: u32 = 6_000;
pub const MAG_CALIBRATION_INTERVAL_US: u32 = 5_000;
pub const MAG_CALIBRATION_SETTLE_US: u32 = 200_000;

// Persistent storage layout
pub const TUNING_RECORD_OFFSET: u32 = 0x0000;
pub const CALIBRATION_RECORD_OFFSET: u32 = 0x0400;
