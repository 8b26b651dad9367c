use std::time::Duration;

// ---

use async_trait::async_trait;
use tokio::sync::mpsc;

// ---

use trickle_domain::{Readiness, Result, TrickleError, TrickleListener};

// ---

use super::LinkSimStream;

// ---------------------------------------------------------------------------
// LinkSimListener
// ---------------------------------------------------------------------------

/// Accept side of a simulated port.
///
/// [`super::LinkSimTransport::connect`] pushes the server end of each new
/// stream pair into `incoming`. `wait_readable` parks the first arrival in
/// `pending` so the following `accept` returns it without blocking.
pub struct LinkSimListener {
    // ---
    port: u16,
    incoming: mpsc::UnboundedReceiver<LinkSimStream>,
    pending: Option<LinkSimStream>,
}

// ---

impl LinkSimListener {
    // ---
    pub(crate) fn new(port: u16, incoming: mpsc::UnboundedReceiver<LinkSimStream>) -> Self {
        // ---
        Self {
            port,
            incoming,
            pending: None,
        }
    }

    // ---

    fn closed(&self) -> TrickleError {
        TrickleError::Transport(format!("link-sim listener on port {} closed", self.port))
    }
}

// ---

#[async_trait]
impl TrickleListener for LinkSimListener {
    // ---
    type Stream = LinkSimStream;

    async fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness> {
        // ---
        if self.pending.is_some() {
            return Ok(Readiness::Ready);
        }

        match tokio::time::timeout(timeout, self.incoming.recv()).await {
            Ok(Some(stream)) => {
                self.pending = Some(stream);
                Ok(Readiness::Ready)
            }
            Ok(None) => Err(self.closed()),
            Err(_elapsed) => Ok(Readiness::Idle),
        }
    }

    // ---

    async fn accept(&mut self) -> Result<LinkSimStream> {
        // ---
        if let Some(stream) = self.pending.take() {
            return Ok(stream);
        }
        match self.incoming.recv().await {
            Some(stream) => Ok(stream),
            None => Err(self.closed()),
        }
    }
}
