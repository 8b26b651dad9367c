use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::error::Result;

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// Outcome of [`TrickleListener::wait_readable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    // ---
    /// A connection is waiting; the next [`TrickleListener::accept`] will not block.
    Ready,

    /// The timeout elapsed with nothing to accept.
    Idle,
}

// ---------------------------------------------------------------------------
// TrickleStream
// ---------------------------------------------------------------------------

/// One full-duplex byte stream between a client and a server handler.
///
/// Implements [`AsyncRead`] + [`AsyncWrite`]; the protocol layer performs
/// full-length writes with `write_all` and full-length reads with
/// `read_exact`, so a short read can only mean the peer is gone.
///
/// `#[async_trait]` keeps `close` dyn-compatible.
#[async_trait]
pub trait TrickleStream: AsyncRead + AsyncWrite + Send + Unpin {
    // ---
    /// Human-readable description of the remote end, for logging.
    fn peer(&self) -> String;

    /// Close the stream. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// TrickleListener
// ---------------------------------------------------------------------------

/// Server side of a transport: yields one [`TrickleStream`] per client.
#[async_trait]
pub trait TrickleListener: Send {
    // ---
    type Stream: TrickleStream + 'static;

    /// Wait up to `timeout` for an incoming connection.
    ///
    /// Returns an error only when waiting itself failed (the listener is
    /// unusable).
    async fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness>;

    /// Accept the next connection, blocking until one arrives.
    async fn accept(&mut self) -> Result<Self::Stream>;
}

// ---------------------------------------------------------------------------
// TrickleTransport
// ---------------------------------------------------------------------------

/// Factory trait for streams and listeners.
///
/// Implementations: `trickle_tcp::TcpTransport`, `trickle_link_sim::LinkSimTransport`.
#[async_trait]
pub trait TrickleTransport: Send + Sync {
    // ---
    type Stream: TrickleStream + 'static;
    type Listener: TrickleListener<Stream = Self::Stream> + 'static;

    /// Connect to a listening peer.
    async fn connect(&self, host: &str, port: u16) -> Result<Self::Stream>;

    /// Bind and listen for incoming connections on `port`.
    async fn listen(&self, port: u16) -> Result<Self::Listener>;
}
