//! Peripheral trait definitions.
//!
//! These traits are the boundary between the control core and the terminal
//! hardware. They are synchronous and non-blocking: the core samples every
//! peripheral once per tick and must never wait on one.

use crate::error::Result;
use crate::types::{ButtonState, Intent};
use doorkey_core::TokenAddress;

/// Contact-bus token reader.
pub trait TokenReader {
    /// Scan the bus once.
    ///
    /// Returns `Ok(None)` when no token is present or the address read
    /// failed its checksum. Addresses returned are always CRC-valid.
    fn try_scan(&mut self) -> Result<Option<TokenAddress>>;
}

/// Operator button inputs.
pub trait ButtonPanel {
    /// Sample the level of every button.
    fn sample(&mut self) -> Result<ButtonState>;
}

/// Status indicator and door strike.
pub trait Actuator {
    /// Apply one output intent.
    fn apply(&mut self, intent: Intent) -> Result<()>;

    /// Apply intents in order, stopping at the first failure.
    fn apply_all(&mut self, intents: &[Intent]) -> Result<()> {
        for intent in intents {
            self.apply(*intent)?;
        }
        Ok(())
    }
}
