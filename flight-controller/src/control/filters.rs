use crate::config::constants::{
    ACCEL_EMA_ALPHA, ACCEL_MEDIAN_WINDOW, ALTITUDE_EMA_ALPHA, ALTITUDE_MEDIAN_WINDOW,
    GYRO_EMA_ALPHA, GYRO_MEDIAN_WINDOW, MAG_EMA_ALPHA, MAG_MEDIAN_WINDOW,
    VERTICAL_VELOCITY_EMA_ALPHA, VERTICAL_VELOCITY_MEDIAN_WINDOW,
};
use crate::drivers::imu_sensors::ImuSample;
use crate::util::math::vectors::Vector3D;
use crate::util::ring_buffer::RingBuffer;

/// Rejects single-sample spikes by returning the median of the last `N` samples.
#[derive(Debug, Clone, Default)]
pub struct MedianFilter<const N: usize> {
    window: RingBuffer<f32, N>,
}

impl<const N: usize> MedianFilter<N> {
    pub fn new() -> Self {
        Self {
            window: RingBuffer::new(),
        }
    }

    pub fn filter(&mut self, raw: f32) -> f32 {
        self.window.push(raw);
        self.window.median().unwrap_or(raw)
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

/// `ema = alpha * sample + (1 - alpha) * ema_prev`
#[derive(Debug, Clone)]
pub struct EmaFilter {
    alpha: f32,
    value: f32,
    initial_value: f32,
    seed_with_first_sample: bool,
    initialized: bool,
}

impl EmaFilter {
    /// Starts from zero.
    pub fn new(alpha: f32) -> Self {
        Self::with_initial_value(alpha, 0.0)
    }

    pub fn with_initial_value(alpha: f32, initial_value: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: initial_value,
            initial_value,
            seed_with_first_sample: false,
            initialized: true,
        }
    }

    /// Takes the first sample as its state, for signals far from zero (altitude).
    pub fn seeded(alpha: f32) -> Self {
        Self {
            seed_with_first_sample: true,
            initialized: false,
            ..Self::new(alpha)
        }
    }

    pub fn filter(&mut self, sample: f32) -> f32 {
        if !self.initialized {
            self.initialized = true;
            self.value = sample;
            return self.value;
        }
        self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = self.initial_value;
        self.initialized = !self.seed_with_first_sample;
    }
}

/// Median followed by EMA, the conditioning applied to every sensor channel.
#[derive(Debug, Clone)]
pub struct ConditionedChannel<const N: usize> {
    median: MedianFilter<N>,
    ema: EmaFilter,
}

impl<const N: usize> ConditionedChannel<N> {
    pub fn new(ema: EmaFilter) -> Self {
        Self {
            median: MedianFilter::new(),
            ema,
        }
    }

    pub fn filter(&mut self, raw: f32) -> f32 {
        let median = self.median.filter(raw);
        self.ema.filter(median)
    }

    pub fn reset(&mut self) {
        self.median.reset();
        self.ema.reset();
    }
}

#[derive(Debug, Clone)]
struct ConditionedAxes<const N: usize> {
    x: ConditionedChannel<N>,
    y: ConditionedChannel<N>,
    z: ConditionedChannel<N>,
}

impl<const N: usize> ConditionedAxes<N> {
    fn new(alpha: f32) -> Self {
        Self {
            x: ConditionedChannel::new(EmaFilter::new(alpha)),
            y: ConditionedChannel::new(EmaFilter::new(alpha)),
            z: ConditionedChannel::new(EmaFilter::new(alpha)),
        }
    }

    fn filter(&mut self, raw: Vector3D) -> Vector3D {
        Vector3D::new(self.x.filter(raw.x), self.y.filter(raw.y), self.z.filter(raw.z))
    }

    fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.z.reset();
    }
}

/// Filter state for the nine IMU channels, altitude and vertical velocity.
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    gyro: ConditionedAxes<GYRO_MEDIAN_WINDOW>,
    accel: ConditionedAxes<ACCEL_MEDIAN_WINDOW>,
    mag: ConditionedAxes<MAG_MEDIAN_WINDOW>,
    altitude: ConditionedChannel<ALTITUDE_MEDIAN_WINDOW>,
    vertical_velocity: ConditionedChannel<VERTICAL_VELOCITY_MEDIAN_WINDOW>,
}

impl SignalConditioner {
    pub fn new() -> Self {
        Self {
            gyro: ConditionedAxes::new(GYRO_EMA_ALPHA),
            accel: ConditionedAxes::new(ACCEL_EMA_ALPHA),
            mag: ConditionedAxes::new(MAG_EMA_ALPHA),
            altitude: ConditionedChannel::new(EmaFilter::seeded(ALTITUDE_EMA_ALPHA)),
            vertical_velocity: ConditionedChannel::new(EmaFilter::new(
                VERTICAL_VELOCITY_EMA_ALPHA,
            )),
        }
    }

    pub fn condition_imu(&mut self, sample: ImuSample) -> ImuSample {
        ImuSample {
            accel: self.accel.filter(sample.accel),
            gyro: self.gyro.filter(sample.gyro),
            mag: self.mag.filter(sample.mag),
        }
    }

    pub fn condition_altitude(&mut self, altitude: f32) -> f32 {
        self.altitude.filter(altitude)
    }

    pub fn condition_vertical_velocity(&mut self, velocity: f32) -> f32 {
        self.vertical_velocity.filter(velocity)
    }

    pub fn reset(&mut self) {
        self.gyro.reset();
        self.accel.reset();
        self.mag.reset();
        self.altitude.reset();
        self.vertical_velocity.reset();
    }
}

impl Default for SignalConditioner {
    fn default() -> Self {
        Self::new()
    }
}
