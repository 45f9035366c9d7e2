use shared_definitions::controller::ControllerInput;
use shared_definitions::telemetry::FlightStatusFlags;

use crate::util::error::ControlLockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightMode {
    Disarmed,
    /// Armed, waiting for throttle. Reference capture happens once on entry.
    ArmedGrounded,
    ArmedFlying,
}

/// One-shot long-press detector: fires once per press cycle after `hold_us`.
#[derive(Debug, Default, Clone)]
pub struct LongPressTracker {
    pressed_since_us: Option<u64>,
    action_done: bool,
}

impl LongPressTracker {
    pub fn update(&mut self, pressed: bool, now_us: u64, hold_us: u64) -> bool {
        if !pressed {
            self.pressed_since_us = None;
            self.action_done = false;
            return false;
        }

        let pressed_since = *self.pressed_since_us.get_or_insert(now_us);
        if !self.action_done && now_us.saturating_sub(pressed_since) >= hold_us {
            self.action_done = true;
            return true;
        }
        false
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_since_us.is_some()
    }
}

/// What changed during one [`FlightStateMachine::update`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StateTransitions {
    pub armed_toggled: bool,
    pub took_off: bool,
    pub headless_changed: bool,
    /// The tuning lock forced a disarm this pass.
    pub disarmed_by_lock: bool,
}

/// Arm/disarm, takeoff detection, headless toggling and the tuning lock.
#[derive(Debug, Clone)]
pub struct FlightStateMachine {
    armed: bool,
    on_flying: bool,
    headless: bool,
    tuning_locked: bool,
    tilt_cutoff: bool,
    reference_captured: bool,
    arm_buttons_pressed: bool,
    headless_on_press: LongPressTracker,
    headless_off_press: LongPressTracker,
    long_press_us: u64,
}

impl FlightStateMachine {
    pub fn new(long_press_us: u64) -> Self {
        Self {
            armed: false,
            on_flying: false,
            headless: false,
            // Boots locked until a command packet clears the tuning flag
            tuning_locked: true,
            tilt_cutoff: false,
            reference_captured: false,
            arm_buttons_pressed: false,
            headless_on_press: LongPressTracker::default(),
            headless_off_press: LongPressTracker::default(),
            long_press_us,
        }
    }

    pub fn update(&mut self, input: &ControllerInput, now_us: u64) -> StateTransitions {
        let mut transitions = StateTransitions::default();

        if self
            .headless_on_press
            .update(input.switch_left, now_us, self.long_press_us)
            && !self.headless
        {
            self.headless = true;
            transitions.headless_changed = true;
            log::info!("Headless mode ON");
        }
        if self
            .headless_off_press
            .update(input.switch_right, now_us, self.long_press_us)
            && self.headless
        {
            self.headless = false;
            transitions.headless_changed = true;
            log::info!("Headless mode OFF");
        }

        let arm_buttons_pressed = input.switch_left && input.switch_right;
        let arm_edge = arm_buttons_pressed && !self.arm_buttons_pressed;
        self.arm_buttons_pressed = arm_buttons_pressed;

        self.tuning_locked = input.web_command != 0;
        if self.tuning_locked {
            if self.armed || self.on_flying {
                transitions.disarmed_by_lock = true;
                log::warn!("Tuning interface active, motors disarmed");
            }
            self.disarm();
            return transitions;
        }

        if arm_edge {
            self.armed = !self.armed;
            self.on_flying = false;
            self.reference_captured = false;
            self.tilt_cutoff = false;
            transitions.armed_toggled = true;
            log::info!("{}", if self.armed { "ARMED" } else { "DISARMED" });
        }

        if self.armed && !self.on_flying && input.y_left != 0 {
            self.on_flying = true;
            transitions.took_off = true;
            log::info!("Takeoff detected");
        }

        transitions
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.on_flying = false;
        self.reference_captured = false;
    }

    pub fn mode(&self) -> FlightMode {
        match (self.armed, self.on_flying) {
            (true, true) => FlightMode::ArmedFlying,
            (true, false) => FlightMode::ArmedGrounded,
            _ => FlightMode::Disarmed,
        }
    }

    /// Rejects ground-only operations (tuning writes, calibration) while armed or flying.
    pub fn ensure_grounded(&self) -> Result<(), ControlLockError> {
        if self.armed || self.on_flying {
            return Err(ControlLockError::LockedWhileFlying);
        }
        Ok(())
    }

    /// Armed and the baseline and yaw reference not yet taken for this arm cycle,
    /// including arming straight into flight with the throttle off centre.
    pub fn needs_reference_capture(&self) -> bool {
        self.armed && !self.reference_captured
    }

    pub fn mark_reference_captured(&mut self) {
        self.reference_captured = true;
    }

    /// Latched until the next arm toggle.
    pub fn engage_tilt_cutoff(&mut self) -> bool {
        let newly_engaged = !self.tilt_cutoff;
        self.tilt_cutoff = true;
        newly_engaged
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_flying(&self) -> bool {
        self.on_flying
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    pub fn is_tuning_locked(&self) -> bool {
        self.tuning_locked
    }

    pub fn is_tilt_cutoff(&self) -> bool {
        self.tilt_cutoff
    }

    pub fn status_flags(&self, calibrating: bool, link_lost: bool) -> FlightStatusFlags {
        FlightStatusFlags::new()
            .with_armed(self.armed)
            .with_on_flying(self.on_flying)
            .with_headless(self.headless)
            .with_tilt_cutoff(self.tilt_cutoff)
            .with_tuning_locked(self.tuning_locked)
            .with_calibrating(calibrating)
            .with_link_lost(link_lost)
    }
}
