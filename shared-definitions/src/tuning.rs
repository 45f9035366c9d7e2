#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub proportional: f32,
    pub integral: f32,
    pub derivative: f32,
}

impl PidGains {
    pub const fn new(proportional: f32, integral: f32, derivative: f32) -> Self {
        Self {
            proportional,
            integral,
            derivative,
        }
    }
}

/// One gain set per controlled axis of a loop stage.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AxisPidGains {
    pub roll: PidGains,
    pub pitch: PidGains,
    pub yaw: PidGains,
    pub altitude: PidGains,
}

/// Per-axis stick shaping: full-scale limit, response multiplier and expo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickShaping {
    pub limit: f32,
    pub response: f32,
    pub expo: f32,
}

impl StickShaping {
    pub const fn new(limit: f32, response: f32, expo: f32) -> Self {
        Self {
            limit,
            response,
            expo,
        }
    }
}
