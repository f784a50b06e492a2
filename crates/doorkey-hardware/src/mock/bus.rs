//! Mock contact bus for testing and development.

use crate::{HardwareError, Result, traits::TokenReader};
use doorkey_core::{TokenAddress, constants::ADDRESS_LEN};
use tokio::sync::mpsc;
use tracing::debug;

/// Mock token bus.
///
/// Raw 8-byte reads are queued through a [`MockBusHandle`]; each call to
/// [`TokenReader::try_scan`] consumes at most one of them and validates its
/// checksum the way a real bus master would.
///
/// # Examples
///
/// ```
/// use doorkey_core::TokenAddress;
/// use doorkey_hardware::mock::MockBus;
/// use doorkey_hardware::TokenReader;
///
/// #[tokio::main]
/// async fn main() -> doorkey_hardware::Result<()> {
///     let (mut bus, handle) = MockBus::new();
///     let token = TokenAddress::with_checksum([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
///
///     handle.present(token).await?;
///     assert_eq!(bus.try_scan()?, Some(token));
///     assert_eq!(bus.try_scan()?, None);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockBus {
    scan_rx: mpsc::Receiver<[u8; ADDRESS_LEN]>,
}

impl MockBus {
    /// Create a new mock bus and the handle that drives it.
    pub fn new() -> (Self, MockBusHandle) {
        let (scan_tx, scan_rx) = mpsc::channel(32);
        (Self { scan_rx }, MockBusHandle { scan_tx })
    }
}

impl TokenReader for MockBus {
    fn try_scan(&mut self) -> Result<Option<TokenAddress>> {
        let raw = match self.scan_rx.try_recv() {
            Ok(raw) => raw,
            Err(mpsc::error::TryRecvError::Empty) => return Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                return Err(HardwareError::disconnected("token bus"));
            }
        };

        match TokenAddress::from_scan(raw) {
            Ok(address) => Ok(Some(address)),
            Err(e) => {
                debug!(error = %e, "Discarding bus read");
                Ok(None)
            }
        }
    }
}

/// Handle for presenting tokens to a [`MockBus`].
#[derive(Debug, Clone)]
pub struct MockBusHandle {
    scan_tx: mpsc::Sender<[u8; ADDRESS_LEN]>,
}

impl MockBusHandle {
    /// Queue one read of a token.
    pub async fn present(&self, address: TokenAddress) -> Result<()> {
        self.present_raw(*address.as_bytes()).await
    }

    /// Queue one read of raw bus bytes, valid or not.
    pub async fn present_raw(&self, bytes: [u8; ADDRESS_LEN]) -> Result<()> {
        self.scan_tx
            .send(bytes)
            .await
            .map_err(|_| HardwareError::disconnected("token bus"))
    }
}
