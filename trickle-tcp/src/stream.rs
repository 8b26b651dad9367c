//! [`TcpLink`] — a connected TCP socket implementing [`TrickleStream`].

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

use trickle_domain::{Result, TrickleStream};

// ---------------------------------------------------------------------------
// TcpLink
// ---------------------------------------------------------------------------

pub struct TcpLink {
    // ---
    inner: TcpStream,
    peer: Option<SocketAddr>,
    closed: bool,
}

// ---

impl TcpLink {
    // ---
    /// Wrap a connected socket. Nagle is disabled: every protocol message
    /// is a few bytes and must leave immediately.
    pub fn new(inner: TcpStream) -> Self {
        // ---
        if let Err(e) = inner.set_nodelay(true) {
            tracing::debug!("set_nodelay failed: {e}");
        }
        let peer = inner.peer_addr().ok();
        Self {
            inner,
            peer,
            closed: false,
        }
    }
}

// ---

#[async_trait]
impl TrickleStream for TcpLink {
    // ---
    fn peer(&self) -> String {
        match self.peer {
            Some(addr) => addr.to_string(),
            None => "unknown peer".to_string(),
        }
    }

    // ---

    async fn close(&mut self) -> Result<()> {
        // ---
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // NotConnected here means the peer beat us to it; the goal is met.
        match self.inner.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---

impl AsyncRead for TcpLink {
    // ---
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

// ---

impl AsyncWrite for TcpLink {
    // ---
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, data)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
