//! Fire-and-forget logging requests.
//!
//! Door openings and applied revocations are reported to the server as
//! hashed identifiers in the query string of a `GET`. Reports are queued and
//! sent one exchange at a time; a report whose exchange fails is dropped.

use bytes::BytesMut;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::TransportError;
use crate::exchange::{Exchange, ExchangeLimits, ExchangeStatus, http_get};
use crate::transport::Transport;
use doorkey_core::constants::{ACCESS_LOG_PATH, MAX_PENDING_REPORTS, REVOCATION_LOG_PATH};
use doorkey_core::{KeyHash, TokenAddress, key_hash};

/// What a report records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Access,
    Revocation,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportKind::Access => write!(f, "access"),
            ReportKind::Revocation => write!(f, "revocation"),
        }
    }
}

/// A queued logging request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub kind: ReportKind,
    pub hash: KeyHash,
}

impl Report {
    /// Request path, with the hash as lowercase hex.
    pub fn path(&self) -> String {
        let prefix = match self.kind {
            ReportKind::Access => ACCESS_LOG_PATH,
            ReportKind::Revocation => REVOCATION_LOG_PATH,
        };
        format!("{prefix}{}", self.hash.to_hex())
    }
}

/// How a report's exchange ended.
#[derive(Debug)]
pub enum ReportOutcome {
    Sent(Report),
    Dropped(Report, TransportError),
}

/// Secrets used to hash reported addresses.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ReportSecrets {
    pub access: Vec<u8>,
    pub revocation: Vec<u8>,
}

impl fmt::Debug for ReportSecrets {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReportSecrets").finish_non_exhaustive()
    }
}

/// Bounded queue of logging requests, sent one per exchange.
#[derive(Debug)]
pub struct ReportClient<T> {
    transport: T,
    limits: ExchangeLimits,
    secrets: ReportSecrets,
    queue: VecDeque<Report>,
    in_flight: Option<(Report, Exchange)>,
    scratch: BytesMut,
}

impl<T: Transport> ReportClient<T> {
    pub fn new(transport: T, config: &ServerConfig, secrets: ReportSecrets) -> Self {
        Self {
            transport,
            limits: config.exchange_limits(),
            secrets,
            queue: VecDeque::with_capacity(MAX_PENDING_REPORTS),
            in_flight: None,
            scratch: BytesMut::new(),
        }
    }

    /// Queue a door-opening report for `address`.
    pub fn queue_access(&mut self, address: &TokenAddress) {
        let hash = key_hash(&self.secrets.access, address);
        self.push(Report {
            kind: ReportKind::Access,
            hash,
        });
    }

    /// Queue an applied-revocation report for `address`.
    pub fn queue_revocation(&mut self, address: &TokenAddress) {
        let hash = key_hash(&self.secrets.revocation, address);
        self.push(Report {
            kind: ReportKind::Revocation,
            hash,
        });
    }

    /// Queue a report, dropping the oldest one when the queue is full.
    pub fn push(&mut self, report: Report) {
        if self.queue.len() == MAX_PENDING_REPORTS
            && let Some(dropped) = self.queue.pop_front()
        {
            warn!(kind = %dropped.kind, "Report queue full, dropping oldest report");
        }
        self.queue.push_back(report);
    }

    /// Reports waiting to be sent, excluding the one in flight.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether there is nothing queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_none()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Advance the current report by one step.
    pub fn tick(&mut self) -> Option<ReportOutcome> {
        if self.in_flight.is_none() {
            let report = self.queue.pop_front()?;
            let exchange = Exchange::fire_and_forget(http_get(&report.path()), self.limits);
            self.in_flight = Some((report, exchange));
        }

        let (report, exchange) = self.in_flight.as_mut()?;
        match exchange.poll(&mut self.transport, &mut self.scratch) {
            ExchangeStatus::InProgress => None,
            ExchangeStatus::Complete => {
                let report = *report;
                self.in_flight = None;
                debug!(kind = %report.kind, "Report sent");
                Some(ReportOutcome::Sent(report))
            }
            ExchangeStatus::Failed(e) => {
                let report = *report;
                self.in_flight = None;
                warn!(kind = %report.kind, error = %e, "Report dropped");
                Some(ReportOutcome::Dropped(report, e))
            }
        }
    }
}
