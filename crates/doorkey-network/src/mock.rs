//! Scripted transport for testing exchanges without a network.

use std::collections::VecDeque;
use std::task::Poll;

use crate::error::{TransportError, TransportResult};
use crate::transport::Transport;

/// How one connection attempt behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectScript {
    /// Connects on the first poll.
    Accept,

    /// Connects after staying pending for the given number of polls.
    AcceptAfter(u32),

    /// Fails on the first poll.
    Refuse,

    /// Never completes.
    Hang,
}

/// One step of the server's side of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvScript {
    /// Bytes available to the next read.
    Data(Vec<u8>),

    /// Nothing available for one read.
    Pending,

    /// Peer closes the connection.
    Close,
}

/// In-memory [`Transport`] that replays scripted behaviour.
///
/// Connection attempts consume [`ConnectScript`]s in order (an empty queue
/// accepts). Each successful connection serves the next queued response
/// script; once a response script runs out, reads stay pending.
///
/// # Example
///
/// ```
/// use std::task::Poll;
/// use doorkey_network::Transport;
/// use doorkey_network::mock::{RecvScript, ScriptedTransport};
///
/// let mut transport = ScriptedTransport::new()
///     .with_response(vec![RecvScript::Data(b"REV0".to_vec()), RecvScript::Close]);
///
/// transport.begin_connect().unwrap();
/// assert!(matches!(transport.poll_connect(), Poll::Ready(Ok(()))));
///
/// let mut buf = [0u8; 16];
/// assert!(matches!(transport.poll_recv(&mut buf), Poll::Ready(Ok(4))));
/// assert!(matches!(transport.poll_recv(&mut buf), Poll::Ready(Ok(0))));
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    connects: VecDeque<ConnectScript>,
    responses: VecDeque<Vec<RecvScript>>,
    send_chunk: Option<usize>,
    fail_sends: u32,

    pending_connect: Option<ConnectScript>,
    current: Option<VecDeque<RecvScript>>,
    connect_attempts: u32,
    sent: Vec<Vec<u8>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the behaviour of the next connection attempt.
    pub fn with_connect(mut self, script: ConnectScript) -> Self {
        self.connects.push_back(script);
        self
    }

    /// Queue the response served on the next successful connection.
    pub fn with_response(mut self, script: Vec<RecvScript>) -> Self {
        self.responses.push_back(script);
        self
    }

    /// Accept at most `chunk` bytes per send call.
    pub fn with_send_chunk(mut self, chunk: usize) -> Self {
        self.send_chunk = Some(chunk);
        self
    }

    /// Fail the next `count` send calls with a lost connection.
    pub fn with_failed_sends(mut self, count: u32) -> Self {
        self.fail_sends = count;
        self
    }

    /// Number of connection attempts started.
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    /// Bytes written on each connection, in connection order.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }
}

impl Transport for ScriptedTransport {
    fn begin_connect(&mut self) -> TransportResult<()> {
        self.close();
        self.connect_attempts += 1;
        self.pending_connect = Some(self.connects.pop_front().unwrap_or(ConnectScript::Accept));
        Ok(())
    }

    fn poll_connect(&mut self) -> Poll<TransportResult<()>> {
        if self.current.is_some() {
            return Poll::Ready(Ok(()));
        }
        let Some(script) = self.pending_connect.take() else {
            return Poll::Ready(Err(TransportError::NotConnected));
        };

        match script {
            ConnectScript::Accept | ConnectScript::AcceptAfter(0) => {
                self.current = Some(self.responses.pop_front().unwrap_or_default().into());
                self.sent.push(Vec::new());
                Poll::Ready(Ok(()))
            }
            ConnectScript::AcceptAfter(n) => {
                self.pending_connect = Some(ConnectScript::AcceptAfter(n - 1));
                Poll::Pending
            }
            ConnectScript::Refuse => Poll::Ready(Err(TransportError::ConnectFailed(
                "connection refused".to_string(),
            ))),
            ConnectScript::Hang => {
                self.pending_connect = Some(ConnectScript::Hang);
                Poll::Pending
            }
        }
    }

    fn poll_send(&mut self, buf: &[u8]) -> Poll<TransportResult<usize>> {
        if self.current.is_none() {
            return Poll::Ready(Err(TransportError::NotConnected));
        }
        if self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Poll::Ready(Err(TransportError::ConnectionLost(
                "connection reset".to_string(),
            )));
        }

        let n = self.send_chunk.map_or(buf.len(), |chunk| chunk.min(buf.len()));
        if let Some(sent) = self.sent.last_mut() {
            sent.extend_from_slice(&buf[..n]);
        }
        Poll::Ready(Ok(n))
    }

    fn poll_recv(&mut self, buf: &mut [u8]) -> Poll<TransportResult<usize>> {
        let Some(script) = self.current.as_mut() else {
            return Poll::Ready(Err(TransportError::NotConnected));
        };

        match script.pop_front() {
            None | Some(RecvScript::Pending) => Poll::Pending,
            Some(RecvScript::Data(data)) if data.is_empty() => Poll::Pending,
            Some(RecvScript::Close) => {
                script.push_front(RecvScript::Close);
                Poll::Ready(Ok(0))
            }
            Some(RecvScript::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    script.push_front(RecvScript::Data(data.split_off(n)));
                }
                Poll::Ready(Ok(n))
            }
        }
    }

    fn close(&mut self) {
        self.pending_connect = None;
        self.current = None;
    }

    fn is_connected(&self) -> bool {
        self.current.is_some()
    }
}
