pub mod calibration;
pub mod controller;
pub mod telemetry;
pub mod tuning;
