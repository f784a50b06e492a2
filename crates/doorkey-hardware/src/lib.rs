//! Peripheral abstraction layer for the doorkey terminal.
//!
//! The control core talks to three kinds of peripheral:
//!
//! - [`TokenReader`] - the contact bus, yielding CRC-validated token addresses
//! - [`ButtonPanel`] - the operator buttons (add user, revoke, add admin)
//! - [`Actuator`] - the tri-colour status indicator and the door strike
//!
//! Outputs are expressed as [`Intent`] values so the state machine never
//! touches a device directly. Pin-level driving is left to implementations
//! of [`Actuator`].
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides channel-driven devices for tests and for the
//! simulated terminal run by the `doorkey` binary.
//!
//! ```
//! use doorkey_core::IndicatorColor;
//! use doorkey_hardware::mock::RecordingActuator;
//! use doorkey_hardware::{Actuator, Intent};
//!
//! let mut actuator = RecordingActuator::new();
//! actuator.apply(Intent::SetIndicator(IndicatorColor::Blue)).unwrap();
//! assert_eq!(actuator.indicator(), IndicatorColor::Blue);
//! ```

pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result};
pub use traits::{Actuator, ButtonPanel, TokenReader};
pub use types::{Button, ButtonState, Intent, blink};
