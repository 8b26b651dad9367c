//! [`TcpTransport`] — factory for [`TcpLink`]s and [`TcpPortListener`]s.

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};

use trickle_domain::{
    // ---
    Result,
    TrickleError,
    TrickleTransport,
};

use crate::error::TcpError;
use crate::listener::TcpPortListener;
use crate::stream::TcpLink;

// ---------------------------------------------------------------------------
// TcpTransport
// ---------------------------------------------------------------------------

/// Stateless TCP transport. Listeners bind on all IPv4 interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

// ---

#[async_trait]
impl TrickleTransport for TcpTransport {
    // ---
    type Stream = TcpLink;
    type Listener = TcpPortListener;

    async fn connect(&self, host: &str, port: u16) -> Result<TcpLink> {
        // ---
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| TrickleError::Connect {
                addr: format!("{host}:{port}"),
                reason: e.to_string(),
            })?;

        Ok(TcpLink::new(stream))
    }

    // ---

    async fn listen(&self, port: u16) -> Result<TcpPortListener> {
        // ---
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|source| TcpError::Bind { port, source })?;

        Ok(TcpPortListener::new(listener))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
