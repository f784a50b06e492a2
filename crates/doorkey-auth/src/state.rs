//! States of the authentication and enrollment flow.
//!
//! # Valid Transitions
//!
//! - Idle → AwaitingAdminScan → AdminVerifying → AwaitingSubjectScan
//! - AwaitingSubjectScan → Revoking | Adding → AdminPromoting? → Confirm | Fail
//! - AwaitingAdminScan | AwaitingSubjectScan → Fail (scan window expired)
//! - Idle → Authenticating → DoorOpen → DoorOpenHold → DoorClosing → Idle
//! - Authenticating → Deny → Idle
//! - Confirm | Fail → Idle

use doorkey_core::TokenAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enrollment workflow started by an operator button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRole {
    /// Enroll the subject as a user.
    AddUser,

    /// Enroll the subject and grant it admin privilege.
    AddAdmin,

    /// Remove the subject.
    Revoke,
}

impl fmt::Display for WorkflowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowRole::AddUser => "add-user",
            WorkflowRole::AddAdmin => "add-admin",
            WorkflowRole::Revoke => "revoke",
        };
        write!(f, "{}", name)
    }
}

/// Phase of the idle indicator pattern.
///
/// Entering sets the indicator black once; the pattern then cycles
/// Steady (blue) → Off (black) → On (blue) → Off (black).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePhase {
    Entering,
    Steady,
    FirstOff,
    BlinkOn,
    SecondOff,
}

/// All states of the terminal's control flow.
///
/// States that act on a scanned address carry it, so the store operation
/// runs on the tick after the scan as its own step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AuthState {
    /// Waiting for a button press or a token.
    Idle { phase: IdlePhase },

    /// Operator pressed a button; waiting for an admin token.
    AwaitingAdminScan { role: WorkflowRole },

    /// Checking that the scanned token has admin privilege.
    AdminVerifying {
        role: WorkflowRole,
        admin: TokenAddress,
    },

    /// Admin verified; waiting for the token to enroll or revoke.
    AwaitingSubjectScan { role: WorkflowRole },

    /// Removing the subject from the store.
    Revoking { subject: TokenAddress },

    /// Enrolling the subject.
    Adding {
        role: WorkflowRole,
        subject: TokenAddress,
    },

    /// Granting admin privilege to a freshly added subject.
    AdminPromoting { subject: TokenAddress },

    /// Workflow succeeded.
    Confirm,

    /// Workflow failed or timed out.
    Fail,

    /// Looking up a token presented while idle.
    Authenticating { address: TokenAddress },

    /// Token found; energizing the strike.
    DoorOpen { address: TokenAddress },

    /// Strike energized; waiting for the hold time.
    DoorOpenHold,

    /// Releasing the strike.
    DoorClosing,

    /// Token not enrolled.
    Deny,
}

impl AuthState {
    /// Initial state at power-up.
    pub const fn initial() -> Self {
        AuthState::Idle {
            phase: IdlePhase::Entering,
        }
    }

    /// Short name of the state, without its data.
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::Idle { .. } => "Idle",
            AuthState::AwaitingAdminScan { .. } => "AwaitingAdminScan",
            AuthState::AdminVerifying { .. } => "AdminVerifying",
            AuthState::AwaitingSubjectScan { .. } => "AwaitingSubjectScan",
            AuthState::Revoking { .. } => "Revoking",
            AuthState::Adding { .. } => "Adding",
            AuthState::AdminPromoting { .. } => "AdminPromoting",
            AuthState::Confirm => "Confirm",
            AuthState::Fail => "Fail",
            AuthState::Authenticating { .. } => "Authenticating",
            AuthState::DoorOpen { .. } => "DoorOpen",
            AuthState::DoorOpenHold => "DoorOpenHold",
            AuthState::DoorClosing => "DoorClosing",
            AuthState::Deny => "Deny",
        }
    }

    /// Returns `true` for any idle phase.
    pub fn is_idle(&self) -> bool {
        matches!(self, AuthState::Idle { .. })
    }

    /// Workflow role carried by the state, if an enrollment is active.
    pub fn role(&self) -> Option<WorkflowRole> {
        match self {
            AuthState::AwaitingAdminScan { role }
            | AuthState::AdminVerifying { role, .. }
            | AuthState::AwaitingSubjectScan { role }
            | AuthState::Adding { role, .. } => Some(*role),
            AuthState::Revoking { .. } => Some(WorkflowRole::Revoke),
            AuthState::AdminPromoting { .. } => Some(WorkflowRole::AddAdmin),
            _ => None,
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role() {
            Some(role) => write!(f, "{}({})", self.name(), role),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// A recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: AuthState,

    /// The state transitioned to.
    pub to: AuthState,

    /// Tick on which the transition happened.
    pub tick: u64,
}
