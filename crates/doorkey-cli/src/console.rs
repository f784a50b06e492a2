//! Operator console: stdin stands in for the buttons and the token bus,
//! and indicator changes go to the log.

use doorkey_core::constants::ADDRESS_LEN;
use doorkey_core::{IndicatorColor, TokenAddress};
use doorkey_hardware::mock::{MockBusHandle, MockButtonsHandle};
use doorkey_hardware::{Actuator, Button, Intent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// One line of operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Press(Button),
    /// Raw bus read; the checksum is validated by the bus.
    Scan([u8; ADDRESS_LEN]),
    Quit,
}

impl std::str::FromStr for ConsoleCommand {
    type Err = doorkey_core::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let rest: Vec<&str> = words.collect();

        match (command, rest.as_slice()) {
            ("add", []) => Ok(ConsoleCommand::Press(Button::AddUser)),
            ("revoke", []) => Ok(ConsoleCommand::Press(Button::Revoke)),
            ("admin", []) => Ok(ConsoleCommand::Press(Button::AddAdmin)),
            ("scan", parts) if !parts.is_empty() => {
                let address: TokenAddress = parts.join("").parse()?;
                Ok(ConsoleCommand::Scan(*address.as_bytes()))
            }
            ("quit" | "exit", []) => Ok(ConsoleCommand::Quit),
            _ => Err(doorkey_core::Error::Config(format!(
                "unknown command '{}' (expected add, revoke, admin, scan <address> or quit)",
                line.trim()
            ))),
        }
    }
}

/// Forward operator commands from `input` to the mock hardware.
///
/// Returns `true` when the operator asked to quit, `false` when the input
/// ended or the terminal stopped listening.
pub async fn forward_commands<R>(input: R, buttons: MockButtonsHandle, bus: MockBusHandle) -> bool
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read operator input");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let delivered = match line.parse() {
            Ok(ConsoleCommand::Press(button)) => buttons.press(button).await,
            Ok(ConsoleCommand::Scan(raw)) => bus.present_raw(raw).await,
            Ok(ConsoleCommand::Quit) => return true,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };
        if delivered.is_err() {
            break;
        }
    }
    debug!("Operator input closed");
    false
}

/// Actuator that reports indicator and strike changes through the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingActuator {
    indicator: Option<IndicatorColor>,
    strike: bool,
}

impl LoggingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indicator(&self) -> Option<IndicatorColor> {
        self.indicator
    }

    pub fn strike(&self) -> bool {
        self.strike
    }
}

impl Actuator for LoggingActuator {
    fn apply(&mut self, intent: Intent) -> doorkey_hardware::Result<()> {
        match intent {
            Intent::SetIndicator(color) => {
                if self.indicator != Some(color) {
                    debug!(%color, "Indicator");
                    self.indicator = Some(color);
                }
            }
            Intent::SetStrike(on) => {
                if self.strike != on {
                    info!(energized = on, "Strike");
                    self.strike = on;
                }
            }
        }
        Ok(())
    }
}
