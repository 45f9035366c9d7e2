pub mod angles;
pub mod vectors;
