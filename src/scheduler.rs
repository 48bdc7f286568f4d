use serde::{Deserialize, Serialize};

/// Floor for the transmit interval; requests below it are ignored.
pub const MIN_INTERVAL_MS: u32 = 1000;
/// Interval in effect from boot until a command changes it.
pub const DEFAULT_INTERVAL_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct TransmitStats {
    pub scheduled_sends: u32,
    pub forced_sends: u32,
    pub interval_changes: u32,
}

/// Periodic transmit cadence. Any transmission, scheduled or forced,
/// restarts the countdown to the next one.
#[derive(Debug)]
pub struct TransmitScheduler {
    interval_ms: u32,
    last_send_ms: u64,
    stats: TransmitStats,
}

impl TransmitScheduler {
    /// The first transmission falls due one interval after `boot_time_ms`.
    pub fn new(boot_time_ms: u64) -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            last_send_ms: boot_time_ms,
            stats: TransmitStats::default(),
        }
    }

    /// Whether a scheduled transmission is due at `current_time`.
    pub fn due(&self, current_time: u64) -> bool {
        current_time >= self.last_send_ms + u64::from(self.interval_ms)
    }

    /// Record a completed transmission and restart the cadence from it.
    pub fn mark_sent(&mut self, current_time: u64, forced: bool) {
        self.last_send_ms = current_time;
        if forced {
            self.stats.forced_sends += 1;
        } else {
            self.stats.scheduled_sends += 1;
        }
    }

    /// Apply a new interval. Returns false (and changes nothing) when the
    /// request is below the floor.
    pub fn set_interval(&mut self, interval_ms: u32) -> bool {
        if interval_ms < MIN_INTERVAL_MS {
            return false;
        }
        self.interval_ms = interval_ms;
        self.stats.interval_changes += 1;
        true
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn stats(&self) -> TransmitStats {
        self.stats
    }
}

impl Default for TransmitScheduler {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_transmission_due_one_interval_after_boot() {
        let scheduler = TransmitScheduler::new(0);
        assert!(!scheduler.due(0));
        assert!(!scheduler.due(999));
        assert!(scheduler.due(1000));
        assert!(scheduler.due(5000));
    }

    #[test]
    fn test_cadence_anchors_to_boot_time() {
        let scheduler = TransmitScheduler::new(10_000);
        assert!(!scheduler.due(10_999));
        assert!(scheduler.due(11_000));
    }

    #[test]
    fn test_send_restarts_cadence() {
        let mut scheduler = TransmitScheduler::new(0);
        scheduler.mark_sent(1000, false);
        assert!(!scheduler.due(1999));
        assert!(scheduler.due(2000));

        // A forced send pushes the next scheduled one out too.
        scheduler.mark_sent(2500, true);
        assert!(!scheduler.due(3499));
        assert!(scheduler.due(3500));

        let stats = scheduler.stats();
        assert_eq!(stats.scheduled_sends, 1);
        assert_eq!(stats.forced_sends, 1);
    }

    #[test]
    fn test_interval_floor_boundary() {
        let mut scheduler = TransmitScheduler::new(0);
        assert!(!scheduler.set_interval(999));
        assert_eq!(scheduler.interval_ms(), DEFAULT_INTERVAL_MS);
        assert_eq!(scheduler.stats().interval_changes, 0);

        assert!(scheduler.set_interval(1000));
        assert_eq!(scheduler.interval_ms(), 1000);

        assert!(scheduler.set_interval(30_000));
        assert_eq!(scheduler.interval_ms(), 30_000);
        assert_eq!(scheduler.stats().interval_changes, 2);
    }

    #[test]
    fn test_longer_interval_takes_effect_from_last_send() {
        let mut scheduler = TransmitScheduler::new(0);
        scheduler.mark_sent(1000, false);
        assert!(scheduler.set_interval(5000));
        assert!(!scheduler.due(2000));
        assert!(!scheduler.due(5999));
        assert!(scheduler.due(6000));
    }
}
