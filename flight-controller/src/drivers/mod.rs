pub mod barometer;
pub mod imu_sensors;
