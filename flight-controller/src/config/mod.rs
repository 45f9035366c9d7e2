pub mod constants;
pub mod store;
pub mod tuning;
