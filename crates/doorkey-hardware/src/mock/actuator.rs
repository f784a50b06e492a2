//! Recording actuator for tests and the simulated terminal.

use crate::{Result, traits::Actuator, types::Intent};
use doorkey_core::IndicatorColor;
use tracing::{debug, info};

/// Actuator that keeps the current output levels and a log of every intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingActuator {
    indicator: IndicatorColor,
    strike: bool,
    history: Vec<Intent>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self {
            indicator: IndicatorColor::Black,
            strike: false,
            history: Vec::new(),
        }
    }

    /// Current indicator colour.
    pub fn indicator(&self) -> IndicatorColor {
        self.indicator
    }

    /// Whether the strike is energized.
    pub fn strike(&self) -> bool {
        self.strike
    }

    /// Every intent applied so far.
    pub fn history(&self) -> &[Intent] {
        &self.history
    }

    /// Forget the recorded intents, keeping the output levels.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Default for RecordingActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for RecordingActuator {
    fn apply(&mut self, intent: Intent) -> Result<()> {
        match intent {
            Intent::SetIndicator(color) => {
                if color != self.indicator {
                    debug!(%color, "Indicator");
                }
                self.indicator = color;
            }
            Intent::SetStrike(on) => {
                if on != self.strike {
                    info!(on, "Door strike");
                }
                self.strike = on;
            }
        }
        self.history.push(intent);
        Ok(())
    }
}
