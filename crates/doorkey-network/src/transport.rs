//! Non-blocking stream transport.
//!
//! The control loop must never wait on the network, so every transport
//! operation is poll-style: it either completes immediately or returns
//! [`Poll::Pending`] and is retried on a later tick.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::error::{TransportError, TransportResult};

/// Poll-style byte stream to the server.
pub trait Transport {
    /// Drop any current connection and start a new one.
    fn begin_connect(&mut self) -> TransportResult<()>;

    /// Check on the connection started by [`begin_connect`](Transport::begin_connect).
    fn poll_connect(&mut self) -> Poll<TransportResult<()>>;

    /// Write a prefix of `buf`, returning how many bytes were accepted.
    fn poll_send(&mut self, buf: &[u8]) -> Poll<TransportResult<usize>>;

    /// Read available bytes into `buf`; `Ok(0)` means the peer closed.
    fn poll_recv(&mut self, buf: &mut [u8]) -> Poll<TransportResult<usize>>;

    /// Drop the connection, if any.
    fn close(&mut self);

    fn is_connected(&self) -> bool;
}

type ConnectFuture = Pin<Box<dyn Future<Output = io::Result<TcpStream>> + Send>>;

/// TCP transport driven by the tokio reactor.
///
/// Futures are polled with a no-op waker: readiness is picked up by
/// re-polling on the next tick rather than by a wakeup. Must be used from
/// within a tokio runtime.
pub struct TcpTransport {
    server_addr: SocketAddr,
    connecting: Option<ConnectFuture>,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        debug!(%server_addr, "Creating TCP transport");
        Self {
            server_addr,
            connecting: None,
            stream: None,
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("server_addr", &self.server_addr)
            .field("connecting", &self.connecting.is_some())
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

impl Transport for TcpTransport {
    fn begin_connect(&mut self) -> TransportResult<()> {
        self.close();
        trace!(server_addr = %self.server_addr, "Connecting");
        self.connecting = Some(Box::pin(TcpStream::connect(self.server_addr)));
        Ok(())
    }

    fn poll_connect(&mut self) -> Poll<TransportResult<()>> {
        if self.stream.is_some() {
            return Poll::Ready(Ok(()));
        }
        let Some(connecting) = self.connecting.as_mut() else {
            return Poll::Ready(Err(TransportError::NotConnected));
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        match connecting.as_mut().poll(&mut cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                self.connecting = None;
                match result {
                    Ok(stream) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY: {}", e);
                        }
                        debug!(server_addr = %self.server_addr, "Connected");
                        self.stream = Some(stream);
                        Poll::Ready(Ok(()))
                    }
                    Err(e) => Poll::Ready(Err(TransportError::ConnectFailed(e.to_string()))),
                }
            }
        }
    }

    fn poll_send(&mut self, buf: &[u8]) -> Poll<TransportResult<usize>> {
        let Some(stream) = self.stream.as_mut() else {
            return Poll::Ready(Err(TransportError::NotConnected));
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        Pin::new(stream)
            .poll_write(&mut cx, buf)
            .map_err(TransportError::from)
    }

    fn poll_recv(&mut self, buf: &mut [u8]) -> Poll<TransportResult<usize>> {
        let Some(stream) = self.stream.as_mut() else {
            return Poll::Ready(Err(TransportError::NotConnected));
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        let mut read_buf = ReadBuf::new(buf);
        match Pin::new(stream).poll_read(&mut cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => Poll::Ready(Ok(read_buf.filled().len())),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e.into())),
        }
    }

    fn close(&mut self) {
        self.connecting = None;
        if self.stream.take().is_some() {
            trace!(server_addr = %self.server_addr, "Connection closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
