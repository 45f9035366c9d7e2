use core::hint::spin_loop;
use core::sync::atomic::{fence, AtomicBool, AtomicI32, AtomicU16, AtomicU32, AtomicU8, Ordering};

use shared_definitions::controller::ControllerInput;
use shared_definitions::telemetry::{FlightStatusFlags, TelemetrySnapshot};

const SNAPSHOT_RETRIES: usize = 8;

pub struct AtomicF32(AtomicU32);
impl AtomicF32 {
    pub const fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }
    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }
    pub fn store(&self, val: f32, order: Ordering) {
        self.0.store(val.to_bits(), order)
    }
}

/// Latest committed command packet, handed from the radio callback to the control loop.
///
/// Single writer. The sequence counter is odd while a packet is being written;
/// readers retry a bounded number of times and otherwise report no snapshot.
pub struct AtomicControllerInput {
    sequence: AtomicU32,
    x_left: AtomicI32,
    y_left: AtomicI32,
    switch_left: AtomicBool,
    x_right: AtomicI32,
    y_right: AtomicI32,
    switch_right: AtomicBool,
    web_command: AtomicU8,
}

impl AtomicControllerInput {
    pub const fn new() -> Self {
        AtomicControllerInput {
            sequence: AtomicU32::new(0),
            x_left: AtomicI32::new(0),
            y_left: AtomicI32::new(0),
            switch_left: AtomicBool::new(false),
            x_right: AtomicI32::new(0),
            y_right: AtomicI32::new(0),
            switch_right: AtomicBool::new(false),
            // Tuning UI owns the vehicle until the first packet says otherwise
            web_command: AtomicU8::new(1),
        }
    }

    pub fn store(&self, input: &ControllerInput) {
        let sequence = self.sequence.load(Ordering::Relaxed);
        self.sequence
            .store(sequence.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.x_left.store(input.x_left, Ordering::Relaxed);
        self.y_left.store(input.y_left, Ordering::Relaxed);
        self.switch_left.store(input.switch_left, Ordering::Relaxed);
        self.x_right.store(input.x_right, Ordering::Relaxed);
        self.y_right.store(input.y_right, Ordering::Relaxed);
        self.switch_right
            .store(input.switch_right, Ordering::Relaxed);
        self.web_command.store(input.web_command, Ordering::Relaxed);

        self.sequence
            .store(sequence.wrapping_add(2), Ordering::Release);
    }

    /// Decodes and commits a received packet. Malformed packets are dropped and the
    /// previous command stays in place.
    pub fn receive_packet(&self, bytes: &[u8]) -> bool {
        match ControllerInput::from_bytes(bytes) {
            Some(input) => {
                self.store(&input);
                true
            }
            None => {
                log::warn!("Dropped command packet of {} bytes", bytes.len());
                false
            }
        }
    }

    /// Consistent copy of the last committed packet, `None` if the writer kept interrupting.
    pub fn read(&self) -> Option<ControllerInput> {
        for _ in 0..SNAPSHOT_RETRIES {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                spin_loop();
                continue;
            }

            let input = ControllerInput {
                x_left: self.x_left.load(Ordering::Relaxed),
                y_left: self.y_left.load(Ordering::Relaxed),
                switch_left: self.switch_left.load(Ordering::Relaxed),
                x_right: self.x_right.load(Ordering::Relaxed),
                y_right: self.y_right.load(Ordering::Relaxed),
                switch_right: self.switch_right.load(Ordering::Relaxed),
                web_command: self.web_command.load(Ordering::Relaxed),
            };

            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return Some(input);
            }
            spin_loop();
        }
        None
    }

    /// Number of packets committed so far (wrapping). Used by the link-loss watchdog.
    pub fn commit_count(&self) -> u32 {
        self.sequence.load(Ordering::Acquire) / 2
    }
}

impl Default for AtomicControllerInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Polled by the tuning UI, written by the control loop once per outer tick.
pub struct AtomicTelemetry {
    pub target_roll: AtomicF32,
    pub target_pitch: AtomicF32,
    pub target_yaw: AtomicF32,
    pub altitude_rate_target: AtomicF32,
    pub current_roll: AtomicF32,
    pub current_pitch: AtomicF32,
    pub current_yaw: AtomicF32,
    pub current_altitude: AtomicF32,
    pub vertical_velocity: AtomicF32,
    pub motor_1_power: AtomicU16,
    pub motor_2_power: AtomicU16,
    pub motor_3_power: AtomicU16,
    pub motor_4_power: AtomicU16,
    pub status: AtomicU8,
}

impl AtomicTelemetry {
    pub const fn new() -> Self {
        AtomicTelemetry {
            target_roll: AtomicF32::new(0.0),
            target_pitch: AtomicF32::new(0.0),
            target_yaw: AtomicF32::new(0.0),
            altitude_rate_target: AtomicF32::new(0.0),
            current_roll: AtomicF32::new(0.0),
            current_pitch: AtomicF32::new(0.0),
            current_yaw: AtomicF32::new(0.0),
            current_altitude: AtomicF32::new(0.0),
            vertical_velocity: AtomicF32::new(0.0),
            motor_1_power: AtomicU16::new(0),
            motor_2_power: AtomicU16::new(0),
            motor_3_power: AtomicU16::new(0),
            motor_4_power: AtomicU16::new(0),
            status: AtomicU8::new(0),
        }
    }

    pub fn publish(&self, snapshot: &TelemetrySnapshot) {
        self.target_roll
            .store(snapshot.target_roll, Ordering::Relaxed);
        self.target_pitch
            .store(snapshot.target_pitch, Ordering::Relaxed);
        self.target_yaw.store(snapshot.target_yaw, Ordering::Relaxed);
        self.altitude_rate_target
            .store(snapshot.altitude_rate_target, Ordering::Relaxed);
        self.current_roll
            .store(snapshot.current_roll, Ordering::Relaxed);
        self.current_pitch
            .store(snapshot.current_pitch, Ordering::Relaxed);
        self.current_yaw
            .store(snapshot.current_yaw, Ordering::Relaxed);
        self.current_altitude
            .store(snapshot.current_altitude, Ordering::Relaxed);
        self.vertical_velocity
            .store(snapshot.vertical_velocity, Ordering::Relaxed);
        self.motor_1_power
            .store(snapshot.motors[0], Ordering::Relaxed);
        self.motor_2_power
            .store(snapshot.motors[1], Ordering::Relaxed);
        self.motor_3_power
            .store(snapshot.motors[2], Ordering::Relaxed);
        self.motor_4_power
            .store(snapshot.motors[3], Ordering::Relaxed);
        self.status
            .store(snapshot.status.into(), Ordering::Release);
    }

    pub fn read(&self) -> TelemetrySnapshot {
        let status = FlightStatusFlags::from(self.status.load(Ordering::Acquire));
        TelemetrySnapshot {
            target_roll: self.target_roll.load(Ordering::Relaxed),
            target_pitch: self.target_pitch.load(Ordering::Relaxed),
            target_yaw: self.target_yaw.load(Ordering::Relaxed),
            altitude_rate_target: self.altitude_rate_target.load(Ordering::Relaxed),
            current_roll: self.current_roll.load(Ordering::Relaxed),
            current_pitch: self.current_pitch.load(Ordering::Relaxed),
            current_yaw: self.current_yaw.load(Ordering::Relaxed),
            current_altitude: self.current_altitude.load(Ordering::Relaxed),
            vertical_velocity: self.vertical_velocity.load(Ordering::Relaxed),
            motors: [
                self.motor_1_power.load(Ordering::Relaxed),
                self.motor_2_power.load(Ordering::Relaxed),
                self.motor_3_power.load(Ordering::Relaxed),
                self.motor_4_power.load(Ordering::Relaxed),
            ],
            status,
        }
    }
}

impl Default for AtomicTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

pub static SHARED_CONTROLLER_INPUT: AtomicControllerInput = AtomicControllerInput::new();
pub static SHARED_TELEMETRY: AtomicTelemetry = AtomicTelemetry::new();

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn boots_with_the_tuning_flag_set() {
        let shared = AtomicControllerInput::new();
        let input = shared.read().unwrap();
        assert_eq!(input.web_command, 1);
        assert_eq!(shared.commit_count(), 0);
    }

    #[test]
    fn malformed_packets_keep_the_last_command() {
        let shared = AtomicControllerInput::new();
        let command = ControllerInput {
            x_left: -3,
            y_left: 250,
            switch_left: true,
            x_right: 12,
            y_right: -8,
            switch_right: false,
            web_command: 0,
        };
        assert!(shared.receive_packet(&command.to_bytes()));
        assert!(!shared.receive_packet(&command.to_bytes()[..20]));
        assert!(!shared.receive_packet(&[]));
        assert_eq!(shared.read(), Some(command));
        assert_eq!(shared.commit_count(), 1);
    }

    #[test]
    fn readers_never_see_a_torn_packet() {
        let shared = Arc::new(AtomicControllerInput::new());
        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for value in 0..20_000 {
                    shared.store(&ControllerInput {
                        x_left: value,
                        y_left: value,
                        switch_left: value % 2 == 0,
                        x_right: value,
                        y_right: value,
                        switch_right: value % 2 == 0,
                        web_command: 0,
                    });
                }
            })
        };

        while !writer.is_finished() {
            if let Some(input) = shared.read() {
                if input.web_command == 0 {
                    assert_eq!(input.x_left, input.y_right);
                    assert_eq!(input.y_left, input.x_right);
                    assert_eq!(input.switch_left, input.switch_right);
                    assert_eq!(input.switch_left, input.x_left % 2 == 0);
                }
            }
        }
        writer.join().unwrap();
        assert_eq!(shared.commit_count(), 20_000);
        assert_eq!(shared.read().unwrap().x_left, 19_999);
    }

    #[test]
    fn telemetry_round_trips_through_the_atomics() {
        let telemetry = AtomicTelemetry::new();
        let snapshot = TelemetrySnapshot {
            target_roll: 4.5,
            current_yaw: 271.25,
            current_altitude: 101.5,
            motors: [480, 530, 430, 100],
            status: FlightStatusFlags::new().with_armed(true).with_on_flying(true),
            ..Default::default()
        };
        telemetry.publish(&snapshot);
        assert_eq!(telemetry.read(), snapshot);
    }
}
