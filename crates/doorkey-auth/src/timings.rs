//! Timing policy of the authentication state machine.

use doorkey_core::constants::{
    CONFIRM_TICKS, FAIL_TICKS, FAST_BLINK_PERIOD, IDLE_BLINK_TICKS, IDLE_STEADY_TICKS,
    OPEN_TICKS, SCAN_ADMIN_TICKS, SCAN_SUBJECT_TICKS, SLOW_BLINK_PERIOD,
};
use serde::{Deserialize, Serialize};

/// Durations, in ticks, of every timed state.
///
/// # Examples
///
/// ```
/// use doorkey_auth::AuthTimings;
///
/// let timings = AuthTimings::default().fail(50).door_open(10);
/// assert_eq!(timings.fail, 50);
/// assert_eq!(timings.admin_scan, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthTimings {
    /// Window for the admin scan after a button press
    pub admin_scan: u32,

    /// Window for the subject scan after the admin was verified
    pub subject_scan: u32,

    /// Fail and deny display
    pub fail: u32,

    /// Confirm display
    pub confirm: u32,

    /// Strike hold time
    pub door_open: u32,

    /// Steady phase of the idle pattern
    pub idle_steady: u32,

    /// Each short phase of the idle double blink
    pub idle_blink: u32,

    /// Blink period while scanning and confirming
    pub slow_blink_period: u32,

    /// Blink period of the fail and deny displays
    pub fast_blink_period: u32,
}

impl Default for AuthTimings {
    fn default() -> Self {
        Self {
            admin_scan: SCAN_ADMIN_TICKS,
            subject_scan: SCAN_SUBJECT_TICKS,
            fail: FAIL_TICKS,
            confirm: CONFIRM_TICKS,
            door_open: OPEN_TICKS,
            idle_steady: IDLE_STEADY_TICKS,
            idle_blink: IDLE_BLINK_TICKS,
            slow_blink_period: SLOW_BLINK_PERIOD,
            fast_blink_period: FAST_BLINK_PERIOD,
        }
    }
}

impl AuthTimings {
    pub fn admin_scan(mut self, ticks: u32) -> Self {
        self.admin_scan = ticks;
        self
    }

    pub fn subject_scan(mut self, ticks: u32) -> Self {
        self.subject_scan = ticks;
        self
    }

    pub fn fail(mut self, ticks: u32) -> Self {
        self.fail = ticks;
        self
    }

    pub fn confirm(mut self, ticks: u32) -> Self {
        self.confirm = ticks;
        self
    }

    pub fn door_open(mut self, ticks: u32) -> Self {
        self.door_open = ticks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let timings: AuthTimings = serde_json::from_str(r#"{"fail": 20}"#).unwrap();
        assert_eq!(timings.fail, 20);
        assert_eq!(timings.confirm, CONFIRM_TICKS);
        assert_eq!(timings.idle_steady, IDLE_STEADY_TICKS);
    }
}
