//! Wire framing for the Trickle protocol.
//!
//! Four fixed-size messages, no header and no length prefix: each side
//! knows which message comes next from the protocol phase. All integers
//! are little-endian.
//!
//! ```text
//! client                                   server
//!   | LoginRequest   (48 B) ───────────────► |
//!   | ◄─────────────── LoginConfirmed (8 B)  |
//!   | ◄─────────────── DataPacket     (4 B)  |  × (total − sending_from)
//!   | ◄─────────────── DataComplete   (4 B)  |
//!
//! LoginRequest:
//! +----------------------------+---------+------------------+
//! | identity (NUL-padded)      | N (u32) | packets_seen(u32)|
//! +----------------------------+---------+------------------+
//!           40 bytes              4 bytes        4 bytes
//! ```
//!
//! Reads go through `read_exact`, so decode never sees a partial message;
//! a short read surfaces as [`TrickleError::ConnectionClosed`].

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// ---

use trickle_domain::{Result, TrickleError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed width of the identity field in [`LoginRequest`].
pub const IDENTITY_LEN: usize = 40;

// ---------------------------------------------------------------------------
// WireMessage
// ---------------------------------------------------------------------------

/// A fixed-size protocol message.
pub trait WireMessage: Sized {
    // ---
    /// Exact encoded size in bytes.
    const WIRE_LEN: usize;

    /// Name used in error and log messages.
    const NAME: &'static str;

    /// Encode into exactly [`Self::WIRE_LEN`] bytes.
    fn encode(&self) -> Vec<u8>;

    /// Decode from exactly [`Self::WIRE_LEN`] bytes.
    fn decode(buf: &[u8]) -> Self;
}

// ---

fn u32_at(buf: &[u8], at: usize) -> u32 {
    // ---
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(word)
}

// ---------------------------------------------------------------------------
// LoginRequest
// ---------------------------------------------------------------------------

/// Client → server. Opens or resumes the session for `identity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    // ---
    /// Session key; at most [`IDENTITY_LEN`] bytes.
    identity: String,

    /// Total number of values the client wants.
    pub count: u32,

    /// Values the client already holds; 0 for a fresh session.
    pub packets_seen: u32,
}

// ---

impl LoginRequest {
    // ---
    /// Build a login, rejecting identities that do not fit the wire field.
    pub fn new(identity: &str, count: u32, packets_seen: u32) -> Result<Self> {
        // ---
        if identity.len() > IDENTITY_LEN {
            return Err(TrickleError::BadIdentity {
                len: identity.len(),
                max: IDENTITY_LEN,
            });
        }
        Ok(Self {
            identity: identity.to_string(),
            count,
            packets_seen,
        })
    }

    // ---

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

// ---

impl WireMessage for LoginRequest {
    // ---
    const WIRE_LEN: usize = IDENTITY_LEN + 8;
    const NAME: &'static str = "LoginRequest";

    fn encode(&self) -> Vec<u8> {
        // ---
        let mut buf = vec![0u8; Self::WIRE_LEN];
        let id = self.identity.as_bytes();
        buf[..id.len()].copy_from_slice(id);
        buf[IDENTITY_LEN..IDENTITY_LEN + 4].copy_from_slice(&self.count.to_le_bytes());
        buf[IDENTITY_LEN + 4..].copy_from_slice(&self.packets_seen.to_le_bytes());
        buf
    }

    fn decode(buf: &[u8]) -> Self {
        // ---
        let field = &buf[..IDENTITY_LEN];
        let end = field.iter().position(|&b| b == 0).unwrap_or(IDENTITY_LEN);
        Self {
            identity: String::from_utf8_lossy(&field[..end]).into_owned(),
            count: u32_at(buf, IDENTITY_LEN),
            packets_seen: u32_at(buf, IDENTITY_LEN + 4),
        }
    }
}

// ---------------------------------------------------------------------------
// LoginConfirmed
// ---------------------------------------------------------------------------

/// Server → client. Where streaming resumes and how long the session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginConfirmed {
    // ---
    pub sending_from: u32,

    /// Authoritative session length, echoed so the client can detect a
    /// mismatch with its own request.
    pub sending_total: u32,
}

// ---

impl WireMessage for LoginConfirmed {
    // ---
    const WIRE_LEN: usize = 8;
    const NAME: &'static str = "LoginConfirmed";

    fn encode(&self) -> Vec<u8> {
        // ---
        let mut buf = Vec::with_capacity(Self::WIRE_LEN);
        buf.extend_from_slice(&self.sending_from.to_le_bytes());
        buf.extend_from_slice(&self.sending_total.to_le_bytes());
        buf
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            sending_from: u32_at(buf, 0),
            sending_total: u32_at(buf, 4),
        }
    }
}

// ---------------------------------------------------------------------------
// DataPacket / DataComplete
// ---------------------------------------------------------------------------

/// Server → client. One payload value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPacket {
    pub payload: u32,
}

impl WireMessage for DataPacket {
    // ---
    const WIRE_LEN: usize = 4;
    const NAME: &'static str = "DataPacket";

    fn encode(&self) -> Vec<u8> {
        self.payload.to_le_bytes().to_vec()
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            payload: u32_at(buf, 0),
        }
    }
}

// ---

/// Server → client. Checksum over the uncorrupted payload; ends the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataComplete {
    pub checksum: u32,
}

impl WireMessage for DataComplete {
    // ---
    const WIRE_LEN: usize = 4;
    const NAME: &'static str = "DataComplete";

    fn encode(&self) -> Vec<u8> {
        self.checksum.to_le_bytes().to_vec()
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            checksum: u32_at(buf, 0),
        }
    }
}

// ---------------------------------------------------------------------------
// send_msg / recv_msg
// ---------------------------------------------------------------------------

/// Encode `msg` and write all of it to `stream`.
pub async fn send_msg<W, M>(stream: &mut W, msg: &M) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
    M: WireMessage,
{
    stream
        .write_all(&msg.encode())
        .await
        .map_err(|e| TrickleError::ConnectionClosed(format!("send {}: {e}", M::NAME)))
}

// ---

/// Read exactly one `M` from `stream`.
pub async fn recv_msg<R, M>(stream: &mut R) -> Result<M>
where
    R: AsyncRead + Unpin + ?Sized,
    M: WireMessage,
{
    let mut buf = vec![0u8; M::WIRE_LEN];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(|e| TrickleError::ConnectionClosed(format!("recv {}: {e}", M::NAME)))?;

    Ok(M::decode(&buf))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
