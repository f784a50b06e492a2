//! Authentication and enrollment policy for the doorkey terminal.
//!
//! [`AuthStateMachine`] consumes one [`InputSnapshot`] per control tick,
//! drives the credential store through
//! [`CredentialRepository`](doorkey_storage::CredentialRepository) and
//! returns the indicator and strike [`Intent`](doorkey_hardware::Intent)s
//! for that tick in a [`TickOutput`].
//!
//! # Flows
//!
//! - **Access**: a known token opens the door for the configured hold time
//!   and requests an access report; an unknown token is denied.
//! - **Enrollment**: an operator button starts a workflow that requires an
//!   admin token followed by the subject token, each within its own window.
//!
//! All timing is counted in ticks (see [`AuthTimings`]); the machine has no
//! notion of wall-clock time.

pub mod machine;
pub mod state;
pub mod timer;
pub mod timings;

pub use machine::{
    AuthStateMachine, AuthStateMachineBuilder, InputSnapshot, MAX_HISTORY_SIZE, TickOutput,
};
pub use state::{AuthState, IdlePhase, StateTransition, WorkflowRole};
pub use timer::Countdown;
pub use timings::AuthTimings;
