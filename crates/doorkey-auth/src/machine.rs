//! Tick-driven authentication and enrollment state machine.

use std::collections::VecDeque;
use std::mem;

use doorkey_core::{IndicatorColor, TokenAddress};
use doorkey_hardware::{ButtonState, Intent, blink};
use doorkey_storage::{AddOutcome, CredentialRepository, StorageError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::state::{AuthState, IdlePhase, StateTransition, WorkflowRole};
use crate::timer::Countdown;
use crate::timings::AuthTimings;

/// Maximum number of state transitions to keep in history.
pub const MAX_HISTORY_SIZE: usize = 100;

/// Inputs sampled at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Operator button levels.
    pub buttons: ButtonState,

    /// CRC-valid address read from the bus this tick, if any.
    pub scanned: Option<TokenAddress>,
}

impl InputSnapshot {
    /// Snapshot with no button down and no token.
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Snapshot with a token on the bus.
    pub fn scan(address: TokenAddress) -> Self {
        Self {
            scanned: Some(address),
            ..Self::default()
        }
    }

    /// Snapshot with button levels only.
    pub fn buttons(buttons: ButtonState) -> Self {
        Self {
            buttons,
            scanned: None,
        }
    }
}

/// Outputs requested by one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutput {
    /// Indicator and strike changes, in order.
    pub intents: Vec<Intent>,

    /// Address whose door opening should be reported to the server.
    pub log_address: Option<TokenAddress>,
}

impl TickOutput {
    fn indicator(&mut self, color: IndicatorColor) {
        self.intents.push(Intent::SetIndicator(color));
    }

    fn strike(&mut self, on: bool) {
        self.intents.push(Intent::SetStrike(on));
    }

    /// Last indicator colour requested this tick.
    pub fn indicator_color(&self) -> Option<IndicatorColor> {
        self.intents.iter().rev().find_map(|intent| match intent {
            Intent::SetIndicator(color) => Some(*color),
            Intent::SetStrike(_) => None,
        })
    }

    /// Last strike level requested this tick.
    pub fn strike_level(&self) -> Option<bool> {
        self.intents.iter().rev().find_map(|intent| match intent {
            Intent::SetStrike(on) => Some(*on),
            Intent::SetIndicator(_) => None,
        })
    }
}

/// Authentication and enrollment state machine.
///
/// This is the only place where access policy and timing live. Every call
/// to [`tick`](AuthStateMachine::tick) runs the current state's action
/// exactly once, consulting inputs in fixed priority: operator button (only
/// while idle, add before revoke before add-admin), then a scanned token,
/// then the state's timer.
///
/// # Examples
///
/// ```
/// use doorkey_auth::{AuthStateMachine, InputSnapshot};
/// use doorkey_core::TokenAddress;
/// use doorkey_storage::{CredentialRepository, CredentialStore, MemoryBackend};
///
/// let mut store = CredentialStore::open(MemoryBackend::default()).unwrap();
/// let token = TokenAddress::with_checksum([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
/// store.add(&token).unwrap();
///
/// let mut machine = AuthStateMachine::new();
/// machine.tick(&InputSnapshot::quiet(), &mut store); // enter idle
/// machine.tick(&InputSnapshot::scan(token), &mut store); // token seen
/// machine.tick(&InputSnapshot::quiet(), &mut store); // lookup
/// let output = machine.tick(&InputSnapshot::quiet(), &mut store);
///
/// assert_eq!(output.log_address, Some(token));
/// assert_eq!(output.strike_level(), Some(true));
/// ```
#[derive(Debug, Clone)]
pub struct AuthStateMachine {
    state: AuthState,
    timer: Countdown,
    timings: AuthTimings,
    ticks: u64,
    history: VecDeque<StateTransition>,
}

impl AuthStateMachine {
    /// Create a machine with default timings, about to enter idle.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for a machine with custom timings or initial state.
    pub fn builder() -> AuthStateMachineBuilder {
        AuthStateMachineBuilder::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn timings(&self) -> &AuthTimings {
        &self.timings
    }

    /// Ticks left on the current state's timer.
    pub fn remaining_ticks(&self) -> u32 {
        self.timer.remaining()
    }

    /// Number of ticks processed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Recent state changes, oldest first.
    ///
    /// Idle phase changes are not recorded.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Advance the machine by one tick.
    ///
    /// Store failures never escape: they end the current workflow on the
    /// fail display, or deny the token during authentication.
    pub fn tick<R>(&mut self, input: &InputSnapshot, store: &mut R) -> TickOutput
    where
        R: CredentialRepository + ?Sized,
    {
        let mut out = TickOutput::default();
        let state = self.state;

        match state {
            AuthState::Idle { phase } => self.idle(phase, input, &mut out),

            AuthState::AwaitingAdminScan { role } => {
                let t = self.timer.remaining();
                out.indicator(blink(
                    IndicatorColor::Black,
                    IndicatorColor::Blue,
                    self.timings.slow_blink_period,
                    t,
                ));
                if let Some(admin) = input.scanned {
                    self.enter(AuthState::AdminVerifying { role, admin });
                } else if self.timer.expired() {
                    warn!(%role, "Admin scan window expired");
                    self.fail();
                }
            }

            AuthState::AdminVerifying { role, admin } => match store.is_admin(&admin) {
                Ok(true) => {
                    debug!(%role, address = %admin, "Admin verified");
                    self.timer.start(self.timings.subject_scan);
                    self.enter(AuthState::AwaitingSubjectScan { role });
                }
                Ok(false) => {
                    warn!(%role, address = %admin, "Token is not an admin");
                    self.fail();
                }
                Err(e) => self.storage_failure(&e),
            },

            AuthState::AwaitingSubjectScan { role } => {
                let t = self.timer.remaining();
                out.indicator(blink(
                    IndicatorColor::Black,
                    IndicatorColor::Yellow,
                    self.timings.slow_blink_period,
                    t,
                ));
                if let Some(subject) = input.scanned {
                    let next = match role {
                        WorkflowRole::Revoke => AuthState::Revoking { subject },
                        WorkflowRole::AddUser | WorkflowRole::AddAdmin => {
                            AuthState::Adding { role, subject }
                        }
                    };
                    self.enter(next);
                } else if self.timer.expired() {
                    warn!(%role, "Subject scan window expired");
                    self.fail();
                }
            }

            AuthState::Revoking { subject } => match store.delete(&subject) {
                Ok(slot) => {
                    info!(slot, address = %subject, "Credential revoked");
                    self.confirm();
                }
                Err(e) => self.storage_failure(&e),
            },

            AuthState::Adding { role, subject } => match store.add(&subject) {
                Ok(outcome) => {
                    match outcome {
                        AddOutcome::Added { slot } => {
                            info!(slot, address = %subject, "Credential enrolled");
                        }
                        AddOutcome::AlreadyExists { slot, demoted } => {
                            info!(slot, address = %subject, demoted, "Credential already enrolled");
                        }
                    }
                    if role == WorkflowRole::AddAdmin {
                        self.enter(AuthState::AdminPromoting { subject });
                    } else {
                        self.confirm();
                    }
                }
                Err(e) => self.storage_failure(&e),
            },

            AuthState::AdminPromoting { subject } => match store.set_admin(&subject) {
                Ok(()) => {
                    info!(address = %subject, "Admin privilege granted");
                    self.confirm();
                }
                Err(e) => self.storage_failure(&e),
            },

            AuthState::Confirm => {
                let t = self.timer.remaining();
                out.indicator(blink(
                    IndicatorColor::Black,
                    IndicatorColor::Green,
                    self.timings.slow_blink_period,
                    t,
                ));
                if self.timer.expired() {
                    self.enter_idle();
                }
            }

            AuthState::Fail => {
                let t = self.timer.remaining();
                out.indicator(blink(
                    IndicatorColor::Red,
                    IndicatorColor::Blue,
                    self.timings.fast_blink_period,
                    t,
                ));
                if self.timer.expired() {
                    self.enter_idle();
                }
            }

            AuthState::Authenticating { address } => match store.find(&address) {
                Ok(Some(slot)) => {
                    debug!(slot, %address, "Token authenticated");
                    self.enter(AuthState::DoorOpen { address });
                }
                Ok(None) => {
                    info!(%address, "Unknown token denied");
                    self.deny();
                }
                Err(e) => {
                    error!(error = %e, %address, "Store lookup failed, denying token");
                    self.deny();
                }
            },

            AuthState::DoorOpen { address } => {
                out.indicator(IndicatorColor::Green);
                out.strike(true);
                out.log_address = Some(address);
                info!(%address, "Door opened");
                self.timer.start(self.timings.door_open);
                self.enter(AuthState::DoorOpenHold);
            }

            AuthState::DoorOpenHold => {
                if self.timer.expired() {
                    self.enter(AuthState::DoorClosing);
                }
            }

            AuthState::DoorClosing => {
                out.strike(false);
                out.indicator(IndicatorColor::Black);
                self.enter_idle();
            }

            AuthState::Deny => {
                let t = self.timer.remaining();
                out.indicator(blink(
                    IndicatorColor::Black,
                    IndicatorColor::Red,
                    self.timings.fast_blink_period,
                    t,
                ));
                if self.timer.expired() {
                    self.enter_idle();
                }
            }
        }

        self.ticks += 1;
        out
    }

    fn idle(&mut self, phase: IdlePhase, input: &InputSnapshot, out: &mut TickOutput) {
        if phase == IdlePhase::Entering {
            out.indicator(IndicatorColor::Black);
            self.timer.start(self.timings.idle_steady);
            self.state = AuthState::Idle {
                phase: IdlePhase::Steady,
            };
            return;
        }

        out.indicator(match phase {
            IdlePhase::FirstOff | IdlePhase::SecondOff => IndicatorColor::Black,
            _ => IndicatorColor::Blue,
        });

        if let Some(role) = pressed_role(&input.buttons) {
            info!(%role, "Enrollment started");
            self.timer.start(self.timings.admin_scan);
            self.enter(AuthState::AwaitingAdminScan { role });
        } else if let Some(address) = input.scanned {
            self.enter(AuthState::Authenticating { address });
        } else if self.timer.expired() {
            let (next, ticks) = match phase {
                IdlePhase::Steady => (IdlePhase::FirstOff, self.timings.idle_blink),
                IdlePhase::FirstOff => (IdlePhase::BlinkOn, self.timings.idle_blink),
                IdlePhase::BlinkOn => (IdlePhase::SecondOff, self.timings.idle_blink),
                IdlePhase::SecondOff | IdlePhase::Entering => {
                    (IdlePhase::Steady, self.timings.idle_steady)
                }
            };
            self.timer.start(ticks);
            self.state = AuthState::Idle { phase: next };
        }
    }

    fn confirm(&mut self) {
        self.timer.start(self.timings.confirm);
        self.enter(AuthState::Confirm);
    }

    fn fail(&mut self) {
        self.timer.start(self.timings.fail);
        self.enter(AuthState::Fail);
    }

    fn deny(&mut self) {
        self.timer.start(self.timings.fail);
        self.enter(AuthState::Deny);
    }

    fn storage_failure(&mut self, e: &StorageError) {
        match e {
            StorageError::NotFound { .. } | StorageError::StoreFull { .. } => {
                warn!(error = %e, state = %self.state, "Enrollment step failed");
            }
            _ => error!(error = %e, state = %self.state, "Store failure during enrollment"),
        }
        self.fail();
    }

    fn enter_idle(&mut self) {
        self.enter(AuthState::initial());
    }

    fn enter(&mut self, to: AuthState) {
        let from = mem::replace(&mut self.state, to);
        if from.is_idle() && to.is_idle() {
            return;
        }

        self.history.push_back(StateTransition {
            from,
            to,
            tick: self.ticks,
        });
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for AuthStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn pressed_role(buttons: &ButtonState) -> Option<WorkflowRole> {
    if buttons.add_user {
        Some(WorkflowRole::AddUser)
    } else if buttons.revoke {
        Some(WorkflowRole::Revoke)
    } else if buttons.add_admin {
        Some(WorkflowRole::AddAdmin)
    } else {
        None
    }
}

/// Builder for [`AuthStateMachine`].
///
/// ```
/// use doorkey_auth::{AuthState, AuthStateMachine, AuthTimings};
///
/// let machine = AuthStateMachine::builder()
///     .with_timings(AuthTimings::default().fail(10))
///     .with_initial_state(AuthState::Fail)
///     .with_timer(10)
///     .build();
///
/// assert_eq!(machine.state(), &AuthState::Fail);
/// assert_eq!(machine.remaining_ticks(), 10);
/// ```
#[derive(Debug, Default)]
pub struct AuthStateMachineBuilder {
    timings: AuthTimings,
    initial_state: AuthState,
    timer: u32,
}

impl AuthStateMachineBuilder {
    pub fn with_timings(mut self, timings: AuthTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_initial_state(mut self, state: AuthState) -> Self {
        self.initial_state = state;
        self
    }

    /// Ticks left on the timer of the initial state.
    pub fn with_timer(mut self, ticks: u32) -> Self {
        self.timer = ticks;
        self
    }

    pub fn build(self) -> AuthStateMachine {
        AuthStateMachine {
            state: self.initial_state,
            timer: Countdown::new(self.timer),
            timings: self.timings,
            ticks: 0,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorkey_core::constants::SLOT_SIZE;
    use doorkey_hardware::Button;
    use doorkey_storage::{CredentialStore, MemoryBackend, StorageResult};
    use doorkey_core::KeyHash;
    use rstest::rstest;

    type Store = CredentialStore<MemoryBackend>;

    fn addr(n: u8) -> TokenAddress {
        TokenAddress::with_checksum([0x01, n, 0x10, 0x20, 0x30, 0x40, 0x50])
    }

    fn admin() -> TokenAddress {
        addr(0xAD)
    }

    /// Store holding one admin and one user, and a machine already idle.
    fn setup(timings: AuthTimings) -> (AuthStateMachine, Store) {
        let mut store = CredentialStore::open(MemoryBackend::default()).unwrap();
        store.add(&admin()).unwrap();
        store.set_admin(&admin()).unwrap();
        store.add(&addr(1)).unwrap();

        let mut machine = AuthStateMachine::builder().with_timings(timings).build();
        machine.tick(&InputSnapshot::quiet(), &mut store);
        (machine, store)
    }

    fn quiet(machine: &mut AuthStateMachine, store: &mut Store, ticks: u32) -> Vec<TickOutput> {
        (0..ticks)
            .map(|_| machine.tick(&InputSnapshot::quiet(), store))
            .collect()
    }

    fn press(button: Button) -> InputSnapshot {
        InputSnapshot::buttons(ButtonState::pressed(button))
    }

    /// Drive a full enrollment workflow up to its store step outcome.
    fn enroll(
        machine: &mut AuthStateMachine,
        store: &mut Store,
        button: Button,
        admin: TokenAddress,
        subject: TokenAddress,
    ) {
        machine.tick(&press(button), store);
        machine.tick(&InputSnapshot::scan(admin), store);
        machine.tick(&InputSnapshot::quiet(), store);
        machine.tick(&InputSnapshot::scan(subject), store);
        machine.tick(&InputSnapshot::quiet(), store);
    }

    struct FailingStore;

    fn io_error() -> StorageError {
        StorageError::Io(std::io::Error::other("medium unavailable"))
    }

    impl CredentialRepository for FailingStore {
        fn find(&self, _: &TokenAddress) -> StorageResult<Option<usize>> {
            Err(io_error())
        }
        fn is_admin(&self, _: &TokenAddress) -> StorageResult<bool> {
            Ok(true)
        }
        fn add(&mut self, _: &TokenAddress) -> StorageResult<AddOutcome> {
            Err(io_error())
        }
        fn delete(&mut self, _: &TokenAddress) -> StorageResult<usize> {
            Err(io_error())
        }
        fn set_admin(&mut self, _: &TokenAddress) -> StorageResult<()> {
            Err(io_error())
        }
        fn clear_admin(&mut self, _: &TokenAddress) -> StorageResult<()> {
            Err(io_error())
        }
        fn match_by_hash(&self, _: &KeyHash, _: &[u8]) -> StorageResult<Option<TokenAddress>> {
            Err(io_error())
        }
        fn erase_all(&mut self) -> StorageResult<()> {
            Err(io_error())
        }
    }

    #[test]
    fn test_new_machine_enters_idle_black() {
        let mut store = CredentialStore::open(MemoryBackend::default()).unwrap();
        let mut machine = AuthStateMachine::new();

        let out = machine.tick(&InputSnapshot::quiet(), &mut store);
        assert_eq!(out.intents, vec![Intent::SetIndicator(IndicatorColor::Black)]);
        assert_eq!(
            machine.state(),
            &AuthState::Idle {
                phase: IdlePhase::Steady
            }
        );
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_idle_indicator_pattern() {
        let mut store = CredentialStore::open(MemoryBackend::default()).unwrap();
        let mut machine = AuthStateMachine::new();

        let colors: Vec<_> = quiet(&mut machine, &mut store, 30)
            .iter()
            .map(|out| out.indicator_color().unwrap())
            .collect();

        use IndicatorColor::{Black, Blue};
        let mut expected = vec![Black];
        expected.extend([Blue; 19]);
        expected.extend([Black; 3]);
        expected.extend([Blue; 3]);
        expected.extend([Black; 3]);
        expected.push(Blue);
        assert_eq!(colors, expected);
    }

    #[rstest]
    #[case(ButtonState { add_user: true, revoke: true, add_admin: true }, WorkflowRole::AddUser)]
    #[case(ButtonState { add_user: false, revoke: true, add_admin: true }, WorkflowRole::Revoke)]
    #[case(ButtonState { add_user: false, revoke: false, add_admin: true }, WorkflowRole::AddAdmin)]
    fn test_button_priority(#[case] buttons: ButtonState, #[case] role: WorkflowRole) {
        let (mut machine, mut store) = setup(AuthTimings::default());
        let input = InputSnapshot {
            buttons,
            scanned: Some(addr(1)),
        };

        machine.tick(&input, &mut store);
        assert_eq!(machine.state(), &AuthState::AwaitingAdminScan { role });
        assert_eq!(machine.remaining_ticks(), machine.timings().admin_scan);
    }

    #[test]
    fn test_buttons_ignored_during_workflow() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        machine.tick(&press(Button::AddUser), &mut store);
        machine.tick(&press(Button::Revoke), &mut store);

        assert_eq!(
            machine.state(),
            &AuthState::AwaitingAdminScan {
                role: WorkflowRole::AddUser
            }
        );
    }

    #[test]
    fn test_known_token_opens_door_once() {
        let timings = AuthTimings::default().door_open(3);
        let (mut machine, mut store) = setup(timings);

        machine.tick(&InputSnapshot::scan(addr(1)), &mut store);
        let mut outputs = quiet(&mut machine, &mut store, 10);

        let logged: Vec<_> = outputs.iter().filter_map(|o| o.log_address).collect();
        assert_eq!(logged, vec![addr(1)]);

        let strikes: Vec<_> = outputs.iter().filter_map(|o| o.strike_level()).collect();
        assert_eq!(strikes, vec![true, false]);

        // lookup, open, hold for 3 + 1 checks, close
        let open = outputs.iter().position(|o| o.strike_level() == Some(true)).unwrap();
        let close = outputs.iter().position(|o| o.strike_level() == Some(false)).unwrap();
        assert_eq!(open, 1);
        assert_eq!(close - open, 5);
        assert_eq!(
            outputs.remove(open).intents,
            vec![
                Intent::SetIndicator(IndicatorColor::Green),
                Intent::SetStrike(true)
            ]
        );
        assert!(machine.state().is_idle());
    }

    #[test]
    fn test_unknown_token_denied() {
        let timings = AuthTimings::default().fail(8);
        let (mut machine, mut store) = setup(timings);

        machine.tick(&InputSnapshot::scan(addr(9)), &mut store);
        machine.tick(&InputSnapshot::quiet(), &mut store);
        assert_eq!(machine.state(), &AuthState::Deny);

        let outputs = quiet(&mut machine, &mut store, 9);
        assert!(outputs.iter().all(|o| o.strike_level().is_none()));
        assert!(outputs.iter().all(|o| o.log_address.is_none()));
        assert!(
            outputs
                .iter()
                .filter_map(|o| o.indicator_color())
                .all(|c| c == IndicatorColor::Black || c == IndicatorColor::Red)
        );
        assert!(machine.state().is_idle());
    }

    #[test]
    fn test_scan_during_deny_is_ignored() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        machine.tick(&InputSnapshot::scan(addr(9)), &mut store);
        machine.tick(&InputSnapshot::quiet(), &mut store);

        let out = machine.tick(&InputSnapshot::scan(addr(1)), &mut store);
        assert_eq!(machine.state(), &AuthState::Deny);
        assert!(out.strike_level().is_none());
    }

    #[test]
    fn test_enroll_user() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        enroll(&mut machine, &mut store, Button::AddUser, admin(), addr(2));

        assert_eq!(machine.state(), &AuthState::Confirm);
        assert!(store.check(&addr(2)).unwrap());
        assert!(!store.is_admin(&addr(2)).unwrap());
    }

    #[test]
    fn test_enroll_admin_promotes() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        enroll(&mut machine, &mut store, Button::AddAdmin, admin(), addr(2));
        assert!(matches!(machine.state(), AuthState::AdminPromoting { .. }));

        machine.tick(&InputSnapshot::quiet(), &mut store);
        assert_eq!(machine.state(), &AuthState::Confirm);
        assert!(store.is_admin(&addr(2)).unwrap());
    }

    #[test]
    fn test_reenroll_admin_as_user_demotes() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        store.add(&addr(2)).unwrap();
        store.set_admin(&addr(2)).unwrap();

        enroll(&mut machine, &mut store, Button::AddUser, admin(), addr(2));
        assert_eq!(machine.state(), &AuthState::Confirm);
        assert!(!store.is_admin(&addr(2)).unwrap());
    }

    #[test]
    fn test_revoke() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        enroll(&mut machine, &mut store, Button::Revoke, admin(), addr(1));

        assert_eq!(machine.state(), &AuthState::Confirm);
        assert!(!store.check(&addr(1)).unwrap());
    }

    #[test]
    fn test_revoke_unknown_fails() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        enroll(&mut machine, &mut store, Button::Revoke, admin(), addr(7));
        assert_eq!(machine.state(), &AuthState::Fail);
    }

    #[test]
    fn test_non_admin_cannot_enroll() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        machine.tick(&press(Button::AddUser), &mut store);
        machine.tick(&InputSnapshot::scan(addr(1)), &mut store);
        machine.tick(&InputSnapshot::quiet(), &mut store);

        assert_eq!(machine.state(), &AuthState::Fail);
        assert_eq!(machine.remaining_ticks(), machine.timings().fail);
    }

    #[test]
    fn test_enroll_into_full_store_fails() {
        let mut store = CredentialStore::open(MemoryBackend::new(2 * SLOT_SIZE)).unwrap();
        store.add(&admin()).unwrap();
        store.set_admin(&admin()).unwrap();
        store.add(&addr(1)).unwrap();
        let mut machine = AuthStateMachine::new();
        machine.tick(&InputSnapshot::quiet(), &mut store);

        enroll(&mut machine, &mut store, Button::AddUser, admin(), addr(2));
        assert_eq!(machine.state(), &AuthState::Fail);
        assert!(!store.check(&addr(2)).unwrap());
    }

    #[test]
    fn test_admin_window_expiry_fails() {
        let timings = AuthTimings::default().admin_scan(3).fail(2);
        let (mut machine, mut store) = setup(timings);
        let before = store.backend().clone();

        machine.tick(&press(Button::AddUser), &mut store);
        quiet(&mut machine, &mut store, 3);
        assert!(matches!(machine.state(), AuthState::AwaitingAdminScan { .. }));

        machine.tick(&InputSnapshot::quiet(), &mut store);
        assert_eq!(machine.state(), &AuthState::Fail);

        quiet(&mut machine, &mut store, 3);
        assert!(machine.state().is_idle());
        assert_eq!(store.backend(), &before);
    }

    #[test]
    fn test_subject_window_expiry_fails() {
        let timings = AuthTimings::default().subject_scan(2);
        let (mut machine, mut store) = setup(timings);

        machine.tick(&press(Button::AddUser), &mut store);
        machine.tick(&InputSnapshot::scan(admin()), &mut store);
        machine.tick(&InputSnapshot::quiet(), &mut store);
        quiet(&mut machine, &mut store, 3);

        assert_eq!(machine.state(), &AuthState::Fail);
    }

    #[test]
    fn test_confirm_returns_to_idle() {
        let timings = AuthTimings::default().confirm(4);
        let (mut machine, mut store) = setup(timings);
        enroll(&mut machine, &mut store, Button::AddUser, admin(), addr(2));

        let outputs = quiet(&mut machine, &mut store, 5);
        assert!(
            outputs
                .iter()
                .filter_map(|o| o.indicator_color())
                .all(|c| c == IndicatorColor::Black || c == IndicatorColor::Green)
        );
        assert_eq!(machine.state(), &AuthState::initial());
        assert_eq!(machine.state().role(), None);
    }

    #[test]
    fn test_store_io_error_fails_workflow() {
        let mut store = FailingStore;
        let mut machine = AuthStateMachine::new();
        machine.tick(&InputSnapshot::quiet(), &mut store);

        machine.tick(&press(Button::AddUser), &mut store);
        machine.tick(&InputSnapshot::scan(admin()), &mut store);
        machine.tick(&InputSnapshot::quiet(), &mut store);
        machine.tick(&InputSnapshot::scan(addr(2)), &mut store);
        machine.tick(&InputSnapshot::quiet(), &mut store);

        assert_eq!(machine.state(), &AuthState::Fail);
    }

    #[test]
    fn test_store_io_error_denies_token() {
        let mut store = FailingStore;
        let mut machine = AuthStateMachine::new();
        machine.tick(&InputSnapshot::quiet(), &mut store);

        machine.tick(&InputSnapshot::scan(addr(1)), &mut store);
        let out = machine.tick(&InputSnapshot::quiet(), &mut store);

        assert_eq!(machine.state(), &AuthState::Deny);
        assert!(out.strike_level().is_none());
    }

    #[test]
    fn test_history_records_workflow() {
        let (mut machine, mut store) = setup(AuthTimings::default());
        enroll(&mut machine, &mut store, Button::AddUser, admin(), addr(2));

        let names: Vec<_> = machine.history().iter().map(|t| t.to.name()).collect();
        assert_eq!(
            names,
            vec![
                "AwaitingAdminScan",
                "AdminVerifying",
                "AwaitingSubjectScan",
                "Adding",
                "Confirm"
            ]
        );
        assert_eq!(machine.history()[0].tick, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let timings = AuthTimings::default().fail(0);
        let (mut machine, mut store) = setup(timings);

        for _ in 0..50 {
            machine.tick(&InputSnapshot::scan(addr(9)), &mut store);
            quiet(&mut machine, &mut store, 3);
        }

        assert_eq!(machine.history().len(), MAX_HISTORY_SIZE);
        assert_eq!(machine.ticks(), 201);
    }
}
