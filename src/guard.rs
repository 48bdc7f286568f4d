use serde::{Deserialize, Serialize};

/// How long after boot the receiver gets to prove it is alive.
pub const LIVENESS_DEADLINE_MS: u64 = 5000;
/// Fewer parsed bytes than this by the deadline means a dead link.
pub const LIVENESS_MIN_BYTES: u32 = 10;
/// Re-announcement period for the sensor-failure terminal state.
pub const SENSOR_FAULT_REANNOUNCE_MS: u64 = 1000;

/// Unrecoverable hardware conditions. Both demand a physical reset; there
/// is no retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatalCondition {
    /// Environmental sensor never answered its init probe.
    SensorFailure,
    /// Navigation receiver produced almost nothing by the deadline.
    ReceiverSilent,
}

/// Startup watchdog. The liveness deadline is evaluated exactly once and
/// never re-armed.
#[derive(Debug)]
pub struct LivenessGuard {
    deadline_at: u64,
    liveness_checked: bool,
}

impl LivenessGuard {
    pub fn new(boot_time_ms: u64) -> Self {
        Self {
            deadline_at: boot_time_ms + LIVENESS_DEADLINE_MS,
            liveness_checked: false,
        }
    }

    /// Decide whether the node must go terminal. Sensor failure wins over
    /// receiver silence when both hold.
    pub fn check(
        &mut self,
        current_time: u64,
        sensor_online: bool,
        receiver_bytes: u32,
    ) -> Option<FatalCondition> {
        if !sensor_online {
            return Some(FatalCondition::SensorFailure);
        }

        if !self.liveness_checked && current_time >= self.deadline_at {
            self.liveness_checked = true;
            if receiver_bytes < LIVENESS_MIN_BYTES {
                return Some(FatalCondition::ReceiverSilent);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_verdict_before_deadline() {
        let mut guard = LivenessGuard::new(0);
        assert_eq!(guard.check(0, true, 0), None);
        assert_eq!(guard.check(4999, true, 0), None);
    }

    #[test]
    fn test_silent_receiver_goes_terminal_at_deadline() {
        let mut guard = LivenessGuard::new(0);
        assert_eq!(guard.check(4999, true, 9), None);
        assert_eq!(
            guard.check(5000, true, 9),
            Some(FatalCondition::ReceiverSilent)
        );
    }

    #[test]
    fn test_deadline_measured_from_boot_time() {
        let mut guard = LivenessGuard::new(10_000);
        assert_eq!(guard.check(14_999, true, 0), None);
        assert_eq!(
            guard.check(15_000, true, 0),
            Some(FatalCondition::ReceiverSilent)
        );
    }

    #[test]
    fn test_threshold_byte_count_passes() {
        let mut guard = LivenessGuard::new(0);
        assert_eq!(guard.check(5000, true, 10), None);
    }

    #[test]
    fn test_deadline_is_never_rearmed() {
        let mut guard = LivenessGuard::new(0);
        assert_eq!(guard.check(6000, true, 50), None);
        // Byte counts are cumulative, so a later low reading can only mean
        // the counter was reset; the verdict must not change either way.
        assert_eq!(guard.check(60_000, true, 50), None);
    }

    #[test]
    fn test_sensor_failure_reported_immediately() {
        let mut guard = LivenessGuard::new(0);
        assert_eq!(guard.check(0, false, 0), Some(FatalCondition::SensorFailure));
    }

    #[test]
    fn test_sensor_failure_outranks_receiver_silence() {
        let mut guard = LivenessGuard::new(0);
        assert_eq!(
            guard.check(5000, false, 0),
            Some(FatalCondition::SensorFailure)
        );
    }
}
