use bitfield_struct::bitfield;

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct FlightStatusFlags {
    pub armed: bool,
    pub on_flying: bool,
    pub headless: bool,
    pub tilt_cutoff: bool,
    pub tuning_locked: bool,
    pub calibrating: bool,
    pub link_lost: bool,
    #[bits(1)]
    __: u8,
}

/// Read-only view published for the tuning UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub target_roll: f32,
    pub target_pitch: f32,
    pub target_yaw: f32,
    pub altitude_rate_target: f32,
    pub current_roll: f32,
    pub current_pitch: f32,
    pub current_yaw: f32,
    pub current_altitude: f32,
    pub vertical_velocity: f32,
    pub motors: [u16; 4],
    pub status: FlightStatusFlags,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            target_roll: 0.0,
            target_pitch: 0.0,
            target_yaw: 0.0,
            altitude_rate_target: 0.0,
            current_roll: 0.0,
            current_pitch: 0.0,
            current_yaw: 0.0,
            current_altitude: 0.0,
            vertical_velocity: 0.0,
            motors: [0; 4],
            status: FlightStatusFlags::new(),
        }
    }
}
