/// Running integral held inside a symmetric bound.
#[derive(Debug, Default, Clone)]
pub struct Integrator {
    current_value: f32,
}

impl Integrator {
    pub fn new() -> Self {
        Integrator {
            current_value: 0.0_f32,
        }
    }

    /// Accumulates `value * interval_seconds`, then clamps to `±limit`.
    /// A negative limit counts as its magnitude, NaN as zero.
    pub fn add_new_value(&mut self, value: f32, interval_seconds: f32, limit: f32) -> f32 {
        let limit = if limit.is_nan() { 0.0 } else { limit.abs() };
        let accumulated = self.current_value + value * interval_seconds;
        if !accumulated.is_nan() {
            self.current_value = accumulated.max(-limit).min(limit);
        }
        self.current_value
    }

    pub fn get_current_value(&self) -> f32 {
        self.current_value
    }

    pub fn reset(&mut self) {
        self.current_value = 0.0;
    }
}
