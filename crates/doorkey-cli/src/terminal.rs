//! The terminal: one control tick over store, state machine, hardware and
//! server clients.

use doorkey_auth::{AuthStateMachine, InputSnapshot, TickOutput};
use doorkey_hardware::{Actuator, ButtonPanel, ButtonState, TokenReader};
use doorkey_network::{ReportClient, RevocationClient, RevocationEvent, Transport};
use doorkey_storage::{CredentialStore, NvBackend};
use tracing::{error, warn};

/// What happened during one tick.
#[derive(Debug, Default)]
pub struct TickSummary {
    pub output: TickOutput,
    pub revocation: Option<RevocationEvent>,
}

/// Revocation and log server clients.
#[derive(Debug)]
pub struct ServerLink<T> {
    pub revocation: RevocationClient<T>,
    pub reports: ReportClient<T>,
}

/// Access-control terminal.
///
/// Each [`tick`](Terminal::tick) runs, in order: input sampling, the state
/// machine, the actuators, access-report queueing, the revocation poll and
/// the report sender. No step waits on I/O.
pub struct Terminal<B, A, T> {
    store: CredentialStore<B>,
    machine: AuthStateMachine,
    reader: Box<dyn TokenReader>,
    buttons: Box<dyn ButtonPanel>,
    actuator: A,
    server: Option<ServerLink<T>>,
}

impl<B, A, T> Terminal<B, A, T>
where
    B: NvBackend,
    A: Actuator,
    T: Transport,
{
    pub fn new(
        store: CredentialStore<B>,
        machine: AuthStateMachine,
        reader: Box<dyn TokenReader>,
        buttons: Box<dyn ButtonPanel>,
        actuator: A,
    ) -> Self {
        Self {
            store,
            machine,
            reader,
            buttons,
            actuator,
            server: None,
        }
    }

    /// Enable revocation polling and access logging.
    pub fn with_server(mut self, server: ServerLink<T>) -> Self {
        self.server = Some(server);
        self
    }

    pub fn store(&self) -> &CredentialStore<B> {
        &self.store
    }

    pub fn machine(&self) -> &AuthStateMachine {
        &self.machine
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn server(&self) -> Option<&ServerLink<T>> {
        self.server.as_ref()
    }

    pub fn server_mut(&mut self) -> Option<&mut ServerLink<T>> {
        self.server.as_mut()
    }

    /// Run one control tick.
    pub fn tick(&mut self) -> TickSummary {
        let input = self.sample();
        let output = self.machine.tick(&input, &mut self.store);

        if let Err(e) = self.actuator.apply_all(&output.intents) {
            error!(error = %e, "Failed to drive actuators");
        }

        let Some(server) = self.server.as_mut() else {
            return TickSummary {
                output,
                revocation: None,
            };
        };

        if let Some(address) = &output.log_address {
            server.reports.queue_access(address);
        }

        let revocation = server.revocation.tick(&mut self.store);
        if let Some(RevocationEvent::Applied { address, .. }) = &revocation {
            server.reports.queue_revocation(address);
        }

        server.reports.tick();

        TickSummary { output, revocation }
    }

    fn sample(&mut self) -> InputSnapshot {
        let buttons = self.buttons.sample().unwrap_or_else(|e| {
            warn!(error = %e, "Button sample failed");
            ButtonState::default()
        });
        let scanned = self.reader.try_scan().unwrap_or_else(|e| {
            warn!(error = %e, "Bus scan failed");
            None
        });
        InputSnapshot { buttons, scanned }
    }
}

impl<B, A, T> std::fmt::Debug for Terminal<B, A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("state", self.machine.state())
            .field("ticks", &self.machine.ticks())
            .field("networked", &self.server.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorkey_auth::{AuthState, AuthTimings};
    use doorkey_core::{TokenAddress, key_hash};
    use doorkey_hardware::mock::{
        MockBus, MockBusHandle, MockButtons, MockButtonsHandle, RecordingActuator,
    };
    use doorkey_hardware::{Button, Intent};
    use doorkey_network::mock::{RecvScript, ScriptedTransport};
    use doorkey_network::{ReportSecrets, ServerConfig};
    use doorkey_storage::{CredentialRepository, MemoryBackend};

    type TestTerminal = Terminal<MemoryBackend, RecordingActuator, ScriptedTransport>;

    fn addr(n: u8) -> TokenAddress {
        TokenAddress::with_checksum([0x01, n, 0, 0, 0, 0, n])
    }

    fn terminal(
        store: CredentialStore<MemoryBackend>,
    ) -> (TestTerminal, MockButtonsHandle, MockBusHandle) {
        let (bus, bus_handle) = MockBus::new();
        let (buttons, buttons_handle) = MockButtons::new();
        let machine = AuthStateMachine::builder()
            .with_timings(AuthTimings::default().fail(6).confirm(4).door_open(3))
            .build();
        let terminal = Terminal::new(
            store,
            machine,
            Box::new(bus),
            Box::new(buttons),
            RecordingActuator::new(),
        );
        (terminal, buttons_handle, bus_handle)
    }

    fn store_with(admin: TokenAddress, users: &[TokenAddress]) -> CredentialStore<MemoryBackend> {
        let mut store = CredentialStore::open(MemoryBackend::new(90)).unwrap();
        store.add(&admin).unwrap();
        store.set_admin(&admin).unwrap();
        for user in users {
            store.add(user).unwrap();
        }
        store
    }

    fn run(terminal: &mut TestTerminal, ticks: usize) -> Vec<TickSummary> {
        (0..ticks).map(|_| terminal.tick()).collect()
    }

    #[tokio::test]
    async fn test_scan_opens_door() {
        let (mut terminal, _buttons, bus) = terminal(store_with(addr(1), &[addr(2)]));
        terminal.tick();

        bus.present(addr(2)).await.unwrap();
        let summaries = run(&mut terminal, 4);

        let logged: Vec<_> = summaries
            .iter()
            .filter_map(|s| s.output.log_address)
            .collect();
        assert_eq!(logged, vec![addr(2)]);
        assert!(terminal.actuator().strike());
    }

    #[tokio::test]
    async fn test_enroll_through_buttons() {
        let admin = addr(1);
        let (mut terminal, buttons, bus) = terminal(store_with(admin, &[]));
        terminal.tick();

        buttons.press(Button::AddUser).await.unwrap();
        run(&mut terminal, 2);
        bus.present(admin).await.unwrap();
        run(&mut terminal, 3);
        bus.present(addr(5)).await.unwrap();
        run(&mut terminal, 3);

        assert!(terminal.store().check(&addr(5)).unwrap());
        assert!(!terminal.store().is_admin(&addr(5)).unwrap());
        assert_eq!(*terminal.machine().state(), AuthState::Confirm);
    }

    #[tokio::test]
    async fn test_access_and_revocation_reported() {
        let admin = addr(1);
        let user = addr(2);
        let secret = b"revocation secret";
        let (terminal, _buttons, bus) = terminal(store_with(admin, &[user]));

        let config = ServerConfig::default().poll_interval_ticks(1000);
        let mut body = b"REV".to_vec();
        body.extend_from_slice(key_hash(secret, &user).as_bytes());
        let revocation = RevocationClient::new(
            ScriptedTransport::new().with_response(vec![RecvScript::Data(body), RecvScript::Close]),
            &config,
            secret.as_slice(),
        );
        let reports = ReportClient::new(
            ScriptedTransport::new(),
            &config,
            ReportSecrets {
                access: b"access secret".to_vec(),
                revocation: secret.to_vec(),
            },
        );
        let mut terminal = terminal.with_server(ServerLink {
            revocation,
            reports,
        });

        terminal.tick();
        bus.present(user).await.unwrap();
        run(&mut terminal, 4);

        let sent = terminal.server().unwrap().reports.transport().sent().to_vec();
        assert_eq!(sent.len(), 1);
        let access_hash = key_hash(b"access secret", &user).to_hex();
        assert!(String::from_utf8_lossy(&sent[0]).contains(&access_hash));

        if let Some(server) = terminal.server_mut() {
            server.revocation.poll_now();
        }
        let summaries = run(&mut terminal, 3);
        assert!(summaries.iter().any(|s| matches!(
            s.revocation,
            Some(RevocationEvent::Applied { address, .. }) if address == user
        )));
        assert!(!terminal.store().check(&user).unwrap());

        run(&mut terminal, 2);
        let sent = terminal.server().unwrap().reports.transport().sent();
        assert_eq!(sent.len(), 2);
        let revocation_hash = key_hash(secret, &user).to_hex();
        let request = String::from_utf8_lossy(&sent[1]);
        assert!(request.contains(&format!("action=log&hash={revocation_hash}")));
    }

    #[tokio::test]
    async fn test_disconnected_hardware_reads_as_quiet() {
        let (mut terminal, buttons, bus) = terminal(store_with(addr(1), &[]));
        drop(buttons);
        drop(bus);

        let summaries = run(&mut terminal, 30);
        assert!(summaries.iter().all(|s| s.output.log_address.is_none()));
        assert!(terminal.machine().state().is_idle());
        assert!(!terminal
            .actuator()
            .history()
            .contains(&Intent::SetStrike(true)));
    }
}
