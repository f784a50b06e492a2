//! Mock peripherals for testing and development.
//!
//! Inputs are driven through cloneable handles backed by tokio channels, so
//! a test or an interactive front end can feed the terminal from another
//! task while the control loop samples without blocking.

pub mod actuator;
pub mod bus;
pub mod buttons;

pub use actuator::RecordingActuator;
pub use bus::{MockBus, MockBusHandle};
pub use buttons::{MockButtons, MockButtonsHandle};
