use crate::util::time::period_us_from_hz;

/// Fixed-period deadline on a free-running microsecond clock.
///
/// The next deadline advances by exactly one period per tick (`next += period`), so
/// an occasionally late pass does not shift the long-term cadence.
#[derive(Debug, Clone)]
pub struct LoopSchedule {
    period_us: u64,
    last_tick_us: u64,
}

impl LoopSchedule {
    pub fn new(frequency_hz: u32, start_us: u64) -> Self {
        Self {
            period_us: period_us_from_hz(frequency_hz),
            last_tick_us: start_us,
        }
    }

    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    /// True at most once per call when a deadline has passed.
    pub fn is_due(&mut self, now_us: u64) -> bool {
        if now_us.wrapping_sub(self.last_tick_us) >= self.period_us {
            self.last_tick_us = self.last_tick_us.wrapping_add(self.period_us);
            true
        } else {
            false
        }
    }

    pub fn restart(&mut self, now_us: u64) {
        self.last_tick_us = now_us;
    }
}

/// Which schedules fired during one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DueTicks {
    pub inner: bool,
    pub outer: bool,
    pub barometer: bool,
    pub telemetry_log: bool,
}

/// The inner (rate), outer (angle) and barometer schedules plus the telemetry log cadence.
#[derive(Debug, Clone)]
pub struct FlightScheduler {
    inner: LoopSchedule,
    outer: LoopSchedule,
    barometer: LoopSchedule,
    telemetry_log: LoopSchedule,
}

impl FlightScheduler {
    pub fn new(
        inner_hz: u32,
        outer_hz: u32,
        barometer_hz: u32,
        telemetry_log_hz: u32,
        start_us: u64,
    ) -> Self {
        Self {
            inner: LoopSchedule::new(inner_hz, start_us),
            outer: LoopSchedule::new(outer_hz, start_us),
            barometer: LoopSchedule::new(barometer_hz, start_us),
            telemetry_log: LoopSchedule::new(telemetry_log_hz, start_us),
        }
    }

    pub fn poll(&mut self, now_us: u64) -> DueTicks {
        DueTicks {
            inner: self.inner.is_due(now_us),
            outer: self.outer.is_due(now_us),
            barometer: self.barometer.is_due(now_us),
            telemetry_log: self.telemetry_log.is_due(now_us),
        }
    }

    /// Realigns every schedule after a blocking ground operation (calibration).
    pub fn restart(&mut self, now_us: u64) {
        self.inner.restart(now_us);
        self.outer.restart(now_us);
        self.barometer.restart(now_us);
        self.telemetry_log.restart(now_us);
    }
}
