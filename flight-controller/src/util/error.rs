use core::fmt::{self, Debug, Display, Formatter};

#[derive(Debug)]
pub struct AppError<E> {
    pub message: &'static str,
    pub error: E,
}

impl<E> Display for AppError<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {:?}", self.message, self.error)
    }
}

impl<E: Debug> std::error::Error for AppError<E> {}

/// A sensor the vehicle cannot fly without failed to come up.
#[derive(Debug)]
pub enum BootError<IE, BE> {
    Imu(IE),
    Barometer(BE),
}

impl<IE: Debug, BE: Debug> Display for BootError<IE, BE> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            BootError::Imu(error) => write!(f, "IMU unavailable {:?}", error),
            BootError::Barometer(error) => write!(f, "Barometer unavailable {:?}", error),
        }
    }
}

impl<IE: Debug, BE: Debug> std::error::Error for BootError<IE, BE> {}

/// Returned for requests that are only allowed on the ground and disarmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLockError {
    LockedWhileFlying,
}

impl Display for ControlLockError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Locked while ARMED/FLYING")
    }
}

impl std::error::Error for ControlLockError {}

#[derive(Debug)]
pub enum TuningError<E> {
    Locked,
    UnknownParameter(String),
    NonFinite(String),
    Storage(AppError<E>),
}

impl<E: Debug> Display for TuningError<E> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TuningError::Locked => write!(f, "{}", ControlLockError::LockedWhileFlying),
            TuningError::UnknownParameter(name) => write!(f, "Unknown parameter {}", name),
            TuningError::NonFinite(name) => write!(f, "Parameter {} is not a finite number", name),
            TuningError::Storage(error) => write!(f, "{}", error),
        }
    }
}

impl<E: Debug> std::error::Error for TuningError<E> {}

impl<E> From<ControlLockError> for TuningError<E> {
    fn from(_: ControlLockError) -> Self {
        TuningError::Locked
    }
}

impl<E> From<AppError<E>> for TuningError<E> {
    fn from(error: AppError<E>) -> Self {
        TuningError::Storage(error)
    }
}

#[derive(Debug)]
pub enum CalibrationError<E> {
    Locked,
    Storage(AppError<E>),
}

impl<E: Debug> Display for CalibrationError<E> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            CalibrationError::Locked => write!(f, "{}", ControlLockError::LockedWhileFlying),
            CalibrationError::Storage(error) => write!(f, "{}", error),
        }
    }
}

impl<E: Debug> std::error::Error for CalibrationError<E> {}

impl<E> From<ControlLockError> for CalibrationError<E> {
    fn from(_: ControlLockError) -> Self {
        CalibrationError::Locked
    }
}

impl<E> From<AppError<E>> for CalibrationError<E> {
    fn from(error: AppError<E>) -> Self {
        CalibrationError::Storage(error)
    }
}
