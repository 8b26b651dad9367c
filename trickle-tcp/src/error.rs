//! Error types for `trickle-tcp`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TcpError {
    // ---
    #[error("bind on port {port} failed: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}

// ---------------------------------------------------------------------------
// Bridge to trickle_domain::TrickleError
// ---------------------------------------------------------------------------

impl From<TcpError> for trickle_domain::TrickleError {
    // ---
    fn from(e: TcpError) -> Self {
        trickle_domain::TrickleError::Transport(e.to_string())
    }
}
