//! Remote revocation polling.
//!
//! Every `poll_interval_ticks` the client asks the server for a pending
//! revocation. A returned hash is resolved against the local store with the
//! revocation secret and the matching credential is deleted. The server only
//! ever learns hashes, never raw addresses.

use bytes::BytesMut;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::TransportError;
use crate::exchange::{Exchange, ExchangeLimits, ExchangeStatus, http_get};
use crate::parser::{PollResponse, RevocationParser};
use crate::transport::Transport;
use doorkey_core::{KeyHash, TokenAddress};
use doorkey_storage::{CredentialRepository, StorageError};

/// Result of a finished poll cycle.
#[derive(Debug)]
pub enum RevocationEvent {
    /// A stored credential matched the hash and was deleted.
    Applied { address: TokenAddress, slot: usize },

    /// The server has nothing pending.
    NothingPending,

    /// The hash matched no stored credential.
    Unresolved(KeyHash),

    /// The response ended before a complete answer; nothing was changed.
    MalformedResponse { received: usize },

    /// The exchange failed after exhausting its retries.
    TransportFailure(TransportError),

    /// The store could not be searched or updated.
    StoreFailure(StorageError),
}

#[derive(Debug)]
struct PollSession {
    exchange: Exchange,
    parser: RevocationParser,
    received: BytesMut,
}

/// Periodic revocation poller, advanced one step per tick.
///
/// # Example
///
/// ```
/// use doorkey_core::{TokenAddress, key_hash};
/// use doorkey_network::mock::{RecvScript, ScriptedTransport};
/// use doorkey_network::{RevocationClient, RevocationEvent, ServerConfig};
/// use doorkey_storage::{CredentialRepository, CredentialStore, MemoryBackend};
///
/// let mut store = CredentialStore::open(MemoryBackend::new(90)).unwrap();
/// let address = TokenAddress::with_checksum([1, 2, 3, 4, 5, 6, 7]);
/// store.add(&address).unwrap();
///
/// let mut body = b"REV".to_vec();
/// body.extend_from_slice(key_hash(b"secret", &address).as_bytes());
/// let transport = ScriptedTransport::new()
///     .with_response(vec![RecvScript::Data(body), RecvScript::Close]);
///
/// let mut client = RevocationClient::new(transport, &ServerConfig::default(), "secret");
/// client.poll_now();
///
/// let event = (0..10).find_map(|_| client.tick(&mut store));
/// assert!(matches!(event, Some(RevocationEvent::Applied { slot: 0, .. })));
/// assert!(!store.check(&address).unwrap());
/// ```
#[derive(Debug)]
pub struct RevocationClient<T> {
    transport: T,
    limits: ExchangeLimits,
    poll_path: String,
    poll_interval: u32,
    secret: Vec<u8>,
    ticks_until_poll: u32,
    session: Option<PollSession>,
}

impl<T: Transport> RevocationClient<T> {
    /// Create a client; the first poll starts after one full interval.
    pub fn new(transport: T, config: &ServerConfig, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            transport,
            limits: config.exchange_limits(),
            poll_path: config.poll_path.clone(),
            poll_interval: config.poll_interval_ticks,
            secret: secret.into(),
            ticks_until_poll: config.poll_interval_ticks,
            session: None,
        }
    }

    /// Start a poll on the next tick.
    pub fn poll_now(&mut self) {
        self.ticks_until_poll = 0;
    }

    /// Whether a poll cycle is in progress.
    pub fn is_polling(&self) -> bool {
        self.session.is_some()
    }

    /// Ticks left before the next poll starts.
    pub fn ticks_until_poll(&self) -> u32 {
        self.ticks_until_poll
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Advance the poll cycle by one step.
    ///
    /// Returns an event only on the tick a cycle ends.
    pub fn tick<R>(&mut self, store: &mut R) -> Option<RevocationEvent>
    where
        R: CredentialRepository + ?Sized,
    {
        if self.session.is_none() {
            if self.ticks_until_poll > 0 {
                self.ticks_until_poll -= 1;
                return None;
            }
            debug!(path = %self.poll_path, "Polling for revocations");
            self.ticks_until_poll = self.poll_interval;
            self.session = Some(PollSession {
                exchange: Exchange::new(http_get(&self.poll_path), self.limits),
                parser: RevocationParser::new(),
                received: BytesMut::new(),
            });
        }

        let session = self.session.as_mut()?;
        let status = session
            .exchange
            .poll(&mut self.transport, &mut session.received);
        if !session.received.is_empty() {
            session.parser.feed(&session.received);
            session.received.clear();
        }

        let outcome = match (session.parser.result(), status) {
            (Some(response), _) => {
                session.exchange.abort(&mut self.transport);
                Ok(response)
            }
            (None, ExchangeStatus::InProgress) => return None,
            (None, ExchangeStatus::Complete) => Ok(session.parser.finish()),
            (None, ExchangeStatus::Failed(e)) => Err(e),
        };
        self.session = None;

        Some(match outcome {
            Ok(response) => self.apply(response, store),
            Err(e) => {
                warn!(error = %e, "Revocation poll abandoned until next cycle");
                RevocationEvent::TransportFailure(e)
            }
        })
    }

    fn apply<R>(&self, response: PollResponse, store: &mut R) -> RevocationEvent
    where
        R: CredentialRepository + ?Sized,
    {
        let hash = match response {
            PollResponse::NothingPending => {
                debug!("No revocation pending");
                return RevocationEvent::NothingPending;
            }
            PollResponse::Malformed { preamble, received } => {
                warn!(preamble, received, "Ignoring incomplete revocation response");
                return RevocationEvent::MalformedResponse { received };
            }
            PollResponse::Revoke(hash) => hash,
        };

        let address = match store.match_by_hash(&hash, &self.secret) {
            Ok(Some(address)) => address,
            Ok(None) => {
                info!(%hash, "Revocation hash matches no stored credential");
                return RevocationEvent::Unresolved(hash);
            }
            Err(e) => {
                error!(error = %e, "Store lookup failed during revocation");
                return RevocationEvent::StoreFailure(e);
            }
        };

        match store.delete(&address) {
            Ok(slot) => {
                info!(slot, %address, "Revocation applied");
                RevocationEvent::Applied { address, slot }
            }
            Err(e) => {
                error!(error = %e, %address, "Failed to delete revoked credential");
                RevocationEvent::StoreFailure(e)
            }
        }
    }
}
