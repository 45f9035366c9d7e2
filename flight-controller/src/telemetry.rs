use shared_definitions::telemetry::TelemetrySnapshot;

pub fn log_snapshot(telemetry: &TelemetrySnapshot) {
    log::debug!(
        "Target R{:.1} P{:.1} Yr{:.1} AltRate {:.2} | Current R{:.1} P{:.1} Y{:.1} Alt {:.2} Vz {:.2} | Motors {:?} | {}",
        telemetry.target_roll,
        telemetry.target_pitch,
        telemetry.target_yaw,
        telemetry.altitude_rate_target,
        telemetry.current_roll,
        telemetry.current_pitch,
        telemetry.current_yaw,
        telemetry.current_altitude,
        telemetry.vertical_velocity,
        telemetry.motors,
        status_label(telemetry),
    );
}

/// Short human readable flight state for log lines.
pub fn status_label(telemetry: &TelemetrySnapshot) -> &'static str {
    let status = telemetry.status;
    if status.tuning_locked() {
        "LOCKED"
    } else if status.calibrating() {
        "CALIBRATING"
    } else if status.tilt_cutoff() {
        "CUTOFF"
    } else if status.on_flying() {
        "FLYING"
    } else if status.armed() {
        "ARMED"
    } else {
        "DISARMED"
    }
}
