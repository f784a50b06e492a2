//! Values exchanged between the peripherals and the control core.

use doorkey_core::IndicatorColor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator buttons on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    /// Enroll a new user credential.
    AddUser,

    /// Remove an enrolled credential.
    Revoke,

    /// Enroll a new admin credential.
    AddAdmin,
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Button::AddUser => "add",
            Button::Revoke => "revoke",
            Button::AddAdmin => "admin",
        };
        write!(f, "{name}")
    }
}

/// Level of every operator button at one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonState {
    pub add_user: bool,
    pub revoke: bool,
    pub add_admin: bool,
}

impl ButtonState {
    /// State with only `button` pressed.
    pub fn pressed(button: Button) -> Self {
        let mut state = Self::default();
        state.set(button, true);
        state
    }

    /// Set the level of one button.
    pub fn set(&mut self, button: Button, down: bool) {
        match button {
            Button::AddUser => self.add_user = down,
            Button::Revoke => self.revoke = down,
            Button::AddAdmin => self.add_admin = down,
        }
    }

    /// Returns `true` if `button` is down.
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::AddUser => self.add_user,
            Button::Revoke => self.revoke,
            Button::AddAdmin => self.add_admin,
        }
    }

    /// Returns `true` if any button is down.
    pub fn any(&self) -> bool {
        self.add_user || self.revoke || self.add_admin
    }
}

/// Output requested by the control core for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Drive the status indicator to a colour.
    SetIndicator(IndicatorColor),

    /// Energize (`true`) or release the door strike.
    SetStrike(bool),
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Intent::SetIndicator(color) => write!(f, "indicator {color}"),
            Intent::SetStrike(true) => write!(f, "strike on"),
            Intent::SetStrike(false) => write!(f, "strike off"),
        }
    }
}

/// Two-colour blink pattern.
///
/// Yields `a` for the first half of every `period` ticks and `b` for the
/// second half. A period below 2 always yields `b`.
///
/// # Examples
///
/// ```
/// use doorkey_core::IndicatorColor;
/// use doorkey_hardware::blink;
///
/// let (a, b) = (IndicatorColor::Black, IndicatorColor::Red);
/// assert_eq!(blink(a, b, 4, 0), a);
/// assert_eq!(blink(a, b, 4, 2), b);
/// assert_eq!(blink(a, b, 4, 5), a);
/// ```
#[must_use]
pub fn blink(a: IndicatorColor, b: IndicatorColor, period: u32, tick: u32) -> IndicatorColor {
    if period > 0 && tick % period < period / 2 {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Button::AddUser)]
    #[case(Button::Revoke)]
    #[case(Button::AddAdmin)]
    fn test_pressed_sets_single_button(#[case] button: Button) {
        let state = ButtonState::pressed(button);
        assert!(state.is_pressed(button));
        assert!(state.any());
        for other in [Button::AddUser, Button::Revoke, Button::AddAdmin] {
            if other != button {
                assert!(!state.is_pressed(other));
            }
        }
    }

    #[test]
    fn test_default_buttons_released() {
        assert!(!ButtonState::default().any());
    }

    #[test]
    fn test_slow_blink_sequence() {
        let colors: Vec<_> = (0..10)
            .map(|t| blink(IndicatorColor::Black, IndicatorColor::Blue, 10, t))
            .collect();
        assert!(colors[..5].iter().all(|&c| c == IndicatorColor::Black));
        assert!(colors[5..].iter().all(|&c| c == IndicatorColor::Blue));
    }

    #[test]
    fn test_blink_degenerate_period() {
        assert_eq!(
            blink(IndicatorColor::Red, IndicatorColor::Blue, 0, 3),
            IndicatorColor::Blue
        );
        assert_eq!(
            blink(IndicatorColor::Red, IndicatorColor::Blue, 1, 0),
            IndicatorColor::Blue
        );
    }

    #[test]
    fn test_intent_serde() {
        let json = serde_json::to_string(&Intent::SetIndicator(IndicatorColor::Green)).unwrap();
        assert_eq!(json, r#"{"set_indicator":"green"}"#);
    }

    #[test]
    fn test_intent_display() {
        assert_eq!(Intent::SetStrike(true).to_string(), "strike on");
        assert_eq!(
            Intent::SetIndicator(IndicatorColor::Yellow).to_string(),
            "indicator yellow"
        );
    }
}
