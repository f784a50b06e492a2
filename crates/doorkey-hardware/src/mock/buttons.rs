//! Mock operator buttons.

use crate::{
    HardwareError, Result,
    traits::ButtonPanel,
    types::{Button, ButtonState},
};
use tokio::sync::mpsc;

/// Mock button panel.
///
/// Each press queued through a [`MockButtonsHandle`] shows up as that
/// button being down for exactly one sample.
#[derive(Debug)]
pub struct MockButtons {
    press_rx: mpsc::Receiver<Button>,
}

impl MockButtons {
    /// Create a new mock panel and the handle that drives it.
    pub fn new() -> (Self, MockButtonsHandle) {
        let (press_tx, press_rx) = mpsc::channel(32);
        (Self { press_rx }, MockButtonsHandle { press_tx })
    }
}

impl ButtonPanel for MockButtons {
    fn sample(&mut self) -> Result<ButtonState> {
        match self.press_rx.try_recv() {
            Ok(button) => Ok(ButtonState::pressed(button)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(ButtonState::default()),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(HardwareError::disconnected("button panel"))
            }
        }
    }
}

/// Handle for pressing buttons on a [`MockButtons`] panel.
#[derive(Debug, Clone)]
pub struct MockButtonsHandle {
    press_tx: mpsc::Sender<Button>,
}

impl MockButtonsHandle {
    /// Press and release `button`.
    pub async fn press(&self, button: Button) -> Result<()> {
        self.press_tx
            .send(button)
            .await
            .map_err(|_| HardwareError::disconnected("button panel"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_press_lasts_one_sample() {
        let (mut panel, handle) = MockButtons::new();
        handle.press(Button::Revoke).await.unwrap();

        let first = panel.sample().unwrap();
        assert!(first.revoke);
        assert!(!first.add_user);
        assert!(!panel.sample().unwrap().any());
    }
}
