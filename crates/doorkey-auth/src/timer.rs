//! Tick countdown timer.

use serde::{Deserialize, Serialize};

/// Countdown measured in control ticks.
///
/// [`expired`](Countdown::expired) is meant to be called once per tick: it
/// consumes one tick while any remain and reports expiry only once the count
/// has reached zero, so a countdown started at `n` expires on the
/// `n + 1`-th check.
///
/// # Examples
///
/// ```
/// use doorkey_auth::Countdown;
///
/// let mut timer = Countdown::new(2);
/// assert!(!timer.expired());
/// assert!(!timer.expired());
/// assert!(timer.expired());
/// assert!(timer.expired());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(ticks: u32) -> Self {
        Self { remaining: ticks }
    }

    /// Restart the countdown at `ticks`.
    pub fn start(&mut self, ticks: u32) {
        self.remaining = ticks;
    }

    /// Consume one tick, returning `true` once nothing is left to consume.
    pub fn expired(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            false
        } else {
            true
        }
    }

    /// Ticks left before the countdown reads as expired.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}
