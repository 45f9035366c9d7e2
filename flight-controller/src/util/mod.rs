pub mod error;
pub mod math;
pub mod ring_buffer;
pub mod time;
