use core::fmt::Debug;

/// Pressure altitude source, sampled at the barometer rate.
pub trait Barometer {
    type Error: Debug;

    fn init(&mut self) -> Result<(), Self::Error>;
    /// Altitude in metres.
    fn read_altitude(&mut self) -> Result<f32, Self::Error>;
}
