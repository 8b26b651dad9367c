//! [`TcpPortListener`] — accept side of the TCP transport.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};

use trickle_domain::{Readiness, Result, TrickleListener};

use crate::error::TcpError;
use crate::stream::TcpLink;

// ---------------------------------------------------------------------------
// TcpPortListener
// ---------------------------------------------------------------------------

/// Listening socket with select-style readiness.
///
/// tokio offers no readiness probe on a listener, so `wait_readable`
/// performs the accept under a timeout and parks the connection in
/// `pending` for the following `accept` call.
pub struct TcpPortListener {
    // ---
    inner: TcpListener,
    pending: Option<TcpStream>,
}

// ---

impl TcpPortListener {
    // ---
    pub(crate) fn new(inner: TcpListener) -> Self {
        Self {
            inner,
            pending: None,
        }
    }

    // ---

    /// Return the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

// ---

#[async_trait]
impl TrickleListener for TcpPortListener {
    // ---
    type Stream = TcpLink;

    async fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness> {
        // ---
        if self.pending.is_some() {
            return Ok(Readiness::Ready);
        }

        match tokio::time::timeout(timeout, self.inner.accept()).await {
            Ok(Ok((stream, addr))) => {
                tracing::trace!(%addr, "incoming connection ready");
                self.pending = Some(stream);
                Ok(Readiness::Ready)
            }
            Ok(Err(e)) => Err(TcpError::Accept(e).into()),
            Err(_elapsed) => Ok(Readiness::Idle),
        }
    }

    // ---

    async fn accept(&mut self) -> Result<TcpLink> {
        // ---
        let stream = match self.pending.take() {
            Some(stream) => stream,
            None => {
                let (stream, _) = self.inner.accept().await.map_err(TcpError::Accept)?;
                stream
            }
        };
        Ok(TcpLink::new(stream))
    }
}
