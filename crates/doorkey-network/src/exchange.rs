//! One HTTP/1.0 request/response cycle, advanced one step per tick.
//!
//! ```text
//! Idle ──> Connecting ──> Sending ──> Receiving ──> Complete
//!              │  ^           │            │
//!              │  └─ retry ───┘            │
//!              └──────────────┴────────────┴──────> Failed
//! ```
//!
//! Connect and send failures (including step timeouts) are retried on a
//! fresh connection until the attempt budget is spent. A receive failure
//! ends the exchange: the request already reached the server.

use bytes::{Buf, Bytes, BytesMut};
use std::task::Poll;
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::transport::Transport;
use doorkey_core::constants::RECV_BUDGET_PER_TICK;

/// Size of the stack buffer used for each read.
const READ_CHUNK: usize = 128;

/// Build a plain `GET` request line for `path`.
///
/// ```
/// use doorkey_network::exchange::http_get;
///
/// assert_eq!(&http_get("/logkey.php?key=00")[..], b"GET /logkey.php?key=00 HTTP/1.0\r\n\r\n");
/// ```
pub fn http_get(path: &str) -> Bytes {
    Bytes::from(format!("GET {path} HTTP/1.0\r\n\r\n"))
}

/// Progress of an exchange after one tick.
#[derive(Debug)]
pub enum ExchangeStatus {
    /// Still working; call again next tick.
    InProgress,

    /// Finished: the peer closed after responding, or the request was sent
    /// and no response is expected.
    Complete,

    /// Gave up.
    Failed(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Idle,
    Connecting,
    Sending,
    Receiving,
    Done,
}

/// Per-exchange limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeLimits {
    /// Connection attempts before giving up
    pub connect_attempts: u8,

    /// Ticks a step may make no progress before it times out
    pub step_timeout_ticks: u32,
}

/// Request/response exchange state machine.
#[derive(Debug)]
pub struct Exchange {
    request: Bytes,
    unsent: Bytes,
    expect_response: bool,
    limits: ExchangeLimits,
    step: Step,
    attempts: u8,
    stalled_ticks: u32,
}

impl Exchange {
    /// Exchange that sends `request` and reads the response until the peer closes.
    pub fn new(request: Bytes, limits: ExchangeLimits) -> Self {
        Self {
            unsent: request.clone(),
            request,
            expect_response: true,
            limits,
            step: Step::Idle,
            attempts: 0,
            stalled_ticks: 0,
        }
    }

    /// Exchange that completes as soon as the request is sent.
    pub fn fire_and_forget(request: Bytes, limits: ExchangeLimits) -> Self {
        Self {
            expect_response: false,
            ..Self::new(request, limits)
        }
    }

    /// Connection attempts started so far.
    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn is_finished(&self) -> bool {
        self.step == Step::Done
    }

    /// Advance by one tick, appending received bytes to `response`.
    pub fn poll<T>(&mut self, transport: &mut T, response: &mut BytesMut) -> ExchangeStatus
    where
        T: Transport + ?Sized,
    {
        match self.step {
            Step::Idle => self.connect(transport),
            Step::Connecting => self.poll_connecting(transport),
            Step::Sending => self.poll_sending(transport),
            Step::Receiving => self.poll_receiving(transport, response),
            Step::Done => ExchangeStatus::Complete,
        }
    }

    /// Abandon the exchange and drop the connection.
    pub fn abort<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        transport.close();
        self.step = Step::Done;
    }

    fn connect<T: Transport + ?Sized>(&mut self, transport: &mut T) -> ExchangeStatus {
        self.attempts += 1;
        self.unsent = self.request.clone();
        self.stalled_ticks = 0;
        trace!(attempt = self.attempts, "Starting connection");

        match transport.begin_connect() {
            Ok(()) => {
                self.step = Step::Connecting;
                self.poll_connecting(transport)
            }
            Err(e) => self.retry_or_fail(transport, e),
        }
    }

    fn poll_connecting<T: Transport + ?Sized>(&mut self, transport: &mut T) -> ExchangeStatus {
        match transport.poll_connect() {
            Poll::Ready(Ok(())) => {
                self.step = Step::Sending;
                self.stalled_ticks = 0;
                self.poll_sending(transport)
            }
            Poll::Ready(Err(e)) => self.retry_or_fail(transport, e),
            Poll::Pending => self.stall(transport, true),
        }
    }

    fn poll_sending<T: Transport + ?Sized>(&mut self, transport: &mut T) -> ExchangeStatus {
        let mut progressed = false;
        while !self.unsent.is_empty() {
            match transport.poll_send(&self.unsent) {
                Poll::Ready(Ok(0)) => {
                    let e = TransportError::ConnectionLost("zero-length write".to_string());
                    return self.retry_or_fail(transport, e);
                }
                Poll::Ready(Ok(n)) => {
                    self.unsent.advance(n);
                    progressed = true;
                }
                Poll::Ready(Err(e)) => return self.retry_or_fail(transport, e),
                Poll::Pending => break,
            }
        }

        if !self.unsent.is_empty() {
            return if progressed {
                self.stalled_ticks = 0;
                ExchangeStatus::InProgress
            } else {
                self.stall(transport, true)
            };
        }

        trace!(bytes = self.request.len(), "Request sent");
        self.stalled_ticks = 0;
        if self.expect_response {
            self.step = Step::Receiving;
            ExchangeStatus::InProgress
        } else {
            self.finish(transport);
            ExchangeStatus::Complete
        }
    }

    fn poll_receiving<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        response: &mut BytesMut,
    ) -> ExchangeStatus {
        let mut chunk = [0u8; READ_CHUNK];
        let mut budget = RECV_BUDGET_PER_TICK;
        let mut progressed = false;

        while budget > 0 {
            let len = budget.min(READ_CHUNK);
            match transport.poll_recv(&mut chunk[..len]) {
                Poll::Ready(Ok(0)) => {
                    trace!(bytes = response.len(), "Peer closed connection");
                    self.finish(transport);
                    return ExchangeStatus::Complete;
                }
                Poll::Ready(Ok(n)) => {
                    response.extend_from_slice(&chunk[..n]);
                    budget -= n;
                    progressed = true;
                }
                Poll::Ready(Err(e)) => {
                    warn!(error = %e, "Receive failed");
                    self.finish(transport);
                    return ExchangeStatus::Failed(e);
                }
                Poll::Pending => break,
            }
        }

        if progressed {
            self.stalled_ticks = 0;
            ExchangeStatus::InProgress
        } else {
            self.stall(transport, false)
        }
    }

    /// Count a tick without progress; a stalled connect or send is retried.
    fn stall<T: Transport + ?Sized>(&mut self, transport: &mut T, retry: bool) -> ExchangeStatus {
        self.stalled_ticks += 1;
        if self.stalled_ticks <= self.limits.step_timeout_ticks {
            return ExchangeStatus::InProgress;
        }

        let e = TransportError::ConnectionTimeout(self.limits.step_timeout_ticks);
        if retry {
            self.retry_or_fail(transport, e)
        } else {
            warn!(step = ?self.step, "Exchange stalled");
            self.finish(transport);
            ExchangeStatus::Failed(e)
        }
    }

    fn retry_or_fail<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        e: TransportError,
    ) -> ExchangeStatus {
        transport.close();
        if self.attempts < self.limits.connect_attempts {
            warn!(
                attempt = self.attempts,
                max_attempts = self.limits.connect_attempts,
                error = %e,
                "Connection attempt failed, retrying"
            );
            self.step = Step::Idle;
            ExchangeStatus::InProgress
        } else {
            warn!(attempts = self.attempts, error = %e, "Giving up on exchange");
            self.step = Step::Done;
            ExchangeStatus::Failed(e)
        }
    }

    fn finish<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        transport.close();
        self.step = Step::Done;
        debug!(attempts = self.attempts, "Exchange finished");
    }
}
