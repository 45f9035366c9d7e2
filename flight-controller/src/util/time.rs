use std::time::Instant;

/// Free-running microsecond tick source driving the loop schedules.
pub trait MonotonicClock {
    fn now_us(&self) -> u64;
}

/// Host clock, counts from construction.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

pub fn period_us_from_hz(frequency_hz: u32) -> u64 {
    1_000_000_u64 / frequency_hz.max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_periods() {
        assert_eq!(period_us_from_hz(400), 2_500);
        assert_eq!(period_us_from_hz(100), 10_000);
        assert_eq!(period_us_from_hz(50), 20_000);
        assert_eq!(period_us_from_hz(0), 1_000_000);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now_us();
        assert!(clock.now_us() >= first);
    }
}
