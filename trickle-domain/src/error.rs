use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum TrickleError {
    // ---
    /// The peer went away, a full read/write could not complete, or the
    /// peer stalled past the I/O deadline.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("connect to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },

    #[error("identity is {len} bytes, limit is {max}")]
    BadIdentity { len: usize, max: usize },

    #[error("requested {requested} values but the server session holds {served}")]
    BadRequest { requested: u32, served: u32 },

    #[error("checksum mismatch: local 0x{local:08X}, remote 0x{remote:08X}")]
    CorruptedDownload { local: u32, remote: u32 },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---

impl TrickleError {
    // ---
    /// `true` for failures a client should answer by reconnecting and
    /// resuming. Everything else ends the transfer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionClosed(_) | Self::Connect { .. })
    }
}

// ---

pub type Result<T> = std::result::Result<T, TrickleError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::TrickleError;

    #[test]
    fn only_link_failures_are_transient() {
        // ---
        assert!(TrickleError::ConnectionClosed("eof".into()).is_transient());
        assert!(TrickleError::Connect {
            addr: "localhost:9000".into(),
            reason: "refused".into(),
        }
        .is_transient());

        assert!(!TrickleError::BadIdentity { len: 41, max: 40 }.is_transient());
        assert!(!TrickleError::BadRequest {
            requested: 5,
            served: 6,
        }
        .is_transient());
        assert!(!TrickleError::CorruptedDownload {
            local: 1,
            remote: 2,
        }
        .is_transient());
        assert!(!TrickleError::Protocol("gap".into()).is_transient());
    }

    #[test]
    fn corrupted_download_renders_both_checksums() {
        // ---
        let err = TrickleError::CorruptedDownload {
            local: 0xFB2B_4489,
            remote: 0x1,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: local 0xFB2B4489, remote 0x00000001"
        );
    }
}
