//! Doorkey terminal application
//!
//! Wires the credential store, the authentication state machine, the
//! (mock) hardware and the server clients into a cooperative tick loop, and
//! provides the provisioning and diagnostic commands of the `doorkey` binary.

pub mod config;
pub mod console;
pub mod terminal;

use anyhow::Context;
use doorkey_auth::AuthStateMachine;
use doorkey_core::{TokenAddress, key_hash};
use doorkey_hardware::mock::{MockBus, MockButtons};
use doorkey_network::{ReportClient, ReportSecrets, RevocationClient, TcpTransport};
use doorkey_storage::{
    CredentialRecord, CredentialRepository, CredentialStore, FileBackend, MemoryBackend, NvBackend,
};
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use config::{Cli, Command, TerminalConfig};
use console::{LoggingActuator, forward_commands};
use terminal::{ServerLink, Terminal};

/// Install the log subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = TerminalConfig::load(cli.config.as_deref())?.with_overrides(&cli);

    match &cli.command {
        Command::Run {
            in_memory, ticks, ..
        } => {
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            let ran = if *in_memory {
                let store = CredentialStore::open(MemoryBackend::new(config.store.size))?;
                run_terminal(store, &config, *ticks, input).await?
            } else {
                run_terminal(open_store(&config)?, &config, *ticks, input).await?
            };
            info!(ticks = ran, "Terminal stopped");
        }
        Command::Erase => {
            let capacity = erase(&config)?;
            println!("Erased {capacity} slots in {}", config.store.path.display());
        }
        Command::Provision { address } => {
            provision(&config, address)?;
            println!("Store erased, {address} enrolled as administrator");
        }
        Command::Dump => {
            for record in dump(&config)? {
                let status = record.status.to_string();
                println!("{:>4}  {status:<6}  {}", record.slot, record.address);
            }
        }
        Command::Hash { address, access } => {
            let secret = if *access {
                &config.access_secret
            } else {
                &config.revocation_secret
            };
            println!("{}", key_hash(secret.as_bytes(), address));
        }
    }
    Ok(())
}

/// Open the configured store image.
pub fn open_store(config: &TerminalConfig) -> anyhow::Result<CredentialStore<FileBackend>> {
    let backend = FileBackend::open(&config.store)
        .with_context(|| format!("cannot open store {}", config.store.path.display()))?;
    Ok(CredentialStore::open(backend)?)
}

/// Erase every slot, returning the store capacity.
pub fn erase(config: &TerminalConfig) -> anyhow::Result<usize> {
    let mut store = open_store(config)?;
    store.erase_all()?;
    Ok(store.capacity())
}

/// Erase the store and enroll `address` as the only administrator.
pub fn provision(config: &TerminalConfig, address: &TokenAddress) -> anyhow::Result<()> {
    if !address.has_valid_checksum() {
        anyhow::bail!("{address} has an invalid checksum byte");
    }

    let mut store = open_store(config)?;
    store.erase_all()?;
    store.add(address)?;
    store.set_admin(address)?;
    info!(%address, "Store provisioned");
    Ok(())
}

/// Occupied slots of the configured store.
pub fn dump(config: &TerminalConfig) -> anyhow::Result<Vec<CredentialRecord>> {
    Ok(open_store(config)?.records()?)
}

/// Run the terminal loop until the operator quits, the tick limit is
/// reached or the process is interrupted. Returns the number of ticks run.
pub async fn run_terminal<B, R>(
    store: CredentialStore<B>,
    config: &TerminalConfig,
    ticks: Option<u64>,
    input: R,
) -> anyhow::Result<u64>
where
    B: NvBackend,
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (bus, bus_handle) = MockBus::new();
    let (buttons, buttons_handle) = MockButtons::new();
    let machine = AuthStateMachine::builder()
        .with_timings(config.timings)
        .build();

    let mut terminal: Terminal<B, LoggingActuator, TcpTransport> = Terminal::new(
        store,
        machine,
        Box::new(bus),
        Box::new(buttons),
        LoggingActuator::new(),
    );

    if let Some(server) = &config.server {
        let address = server.socket_addr()?;
        info!(%address, "Revocation polling enabled");
        terminal = terminal.with_server(ServerLink {
            revocation: RevocationClient::new(
                TcpTransport::new(address),
                server,
                config.revocation_secret.as_bytes(),
            ),
            reports: ReportClient::new(
                TcpTransport::new(address),
                server,
                ReportSecrets {
                    access: config.access_secret.as_bytes().to_vec(),
                    revocation: config.revocation_secret.as_bytes().to_vec(),
                },
            ),
        });
    } else {
        warn!("No server configured, revocation polling disabled");
    }

    // The loop keeps its own handles so the mock hardware stays connected
    // after the operator input ends.
    let mut console = tokio::spawn(forward_commands(
        input,
        buttons_handle.clone(),
        bus_handle.clone(),
    ));
    let mut console_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        capacity = terminal.store().capacity(),
        tick_ms = config.tick_ms,
        "Terminal running"
    );

    let mut ran = 0u64;
    while ticks.is_none_or(|limit| ran < limit) {
        tokio::select! {
            _ = interval.tick() => {}
            exit = &mut console, if console_open => {
                console_open = false;
                if matches!(exit, Ok(true)) {
                    break;
                }
                continue;
            }
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
        }

        terminal.tick();
        ran += 1;
    }

    console.abort();
    drop((buttons_handle, bus_handle));
    Ok(ran)
}
