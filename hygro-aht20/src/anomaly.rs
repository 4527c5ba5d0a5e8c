use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_ZERO_READING_THRESHOLD: u32 = 5;
pub const DEFAULT_RESET_HOLDOFF: Duration = Duration::from_secs(90);

/// Tracks consecutive all-zero readings for one device and decides when a
/// soft reset is warranted.
#[derive(Debug, Clone)]
pub struct AnomalyPolicy {
    threshold: u32,
    holdoff: Duration,
    consecutive_zero_readings: u32,
    last_reset: Instant,
}

/// What the policy concluded about a degenerate reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroReadingVerdict {
    pub consecutive: u32,
    pub since_reset: Duration,
    pub reset_recommended: bool,
}

impl AnomalyPolicy {
    pub fn new(threshold: u32, holdoff: Duration, now: Instant) -> Self {
        Self {
            threshold,
            holdoff,
            consecutive_zero_readings: 0,
            last_reset: now,
        }
    }

    pub fn consecutive_zero_readings(&self) -> u32 {
        self.consecutive_zero_readings
    }

    pub fn last_reset(&self) -> Instant {
        self.last_reset
    }

    /// Count a checksum-valid all-zero reading.
    ///
    /// A reset is recommended once at least `threshold` have been seen in a
    /// row and the last reset is at least `holdoff` in the past.
    pub fn record_zero_reading(&mut self, now: Instant) -> ZeroReadingVerdict {
        self.consecutive_zero_readings = self.consecutive_zero_readings.saturating_add(1);
        let since_reset = now.saturating_duration_since(self.last_reset);

        ZeroReadingVerdict {
            consecutive: self.consecutive_zero_readings,
            since_reset,
            reset_recommended: since_reset >= self.holdoff
                && self.consecutive_zero_readings >= self.threshold,
        }
    }

    /// A valid non-degenerate reading breaks the streak.
    pub fn record_accepted(&mut self) {
        self.consecutive_zero_readings = 0;
    }

    pub fn record_reset(&mut self, now: Instant) {
        self.last_reset = now;
        self.consecutive_zero_readings = 0;
    }
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ZERO_READING_THRESHOLD,
            DEFAULT_RESET_HOLDOFF,
            Instant::now(),
        )
    }
}
