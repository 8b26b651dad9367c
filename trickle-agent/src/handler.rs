//! [`SessionHandler`] — serves one accepted connection.
//!
//! ```text
//! AwaitLogin → ResolveSession → ConfirmLogin → Stream(i)… → SendChecksum → closed
//!      └───────────── any transport failure ─────────────┴──────────────→ closed
//! ```
//!
//! The handler owns its stream exclusively and touches shared state only
//! through [`SessionStore`] calls, none of which span socket I/O. Every
//! send and receive is bounded by `io_timeout`; a stalled peer is treated
//! the same as a vanished one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ---

use tokio::time::{sleep_until, timeout, Instant};

// ---

use trickle_domain::{checksum, Result, TrickleError, TrickleStream};

// ---

use super::{
    // ---
    recv_msg,
    send_msg,
    DataComplete,
    DataPacket,
    FaultInjector,
    LoginConfirmed,
    LoginRequest,
    PayloadGenerator,
    Session,
    SessionStore,
    WireMessage,
};

// ---------------------------------------------------------------------------
// HandlerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct HandlerConfig {
    // ---
    /// Interval between data packets.
    pub pace: Duration,

    /// Upper bound on any single send or receive.
    pub io_timeout: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            pace: Duration::from_secs(1),
            io_timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// HandlerExit
// ---------------------------------------------------------------------------

/// How a handler ended. Returned as the task result and logged on reap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerExit {
    // ---
    /// Every value and the checksum were sent.
    Completed { checksum: u32 },

    /// The client asked for a different length than the stored session.
    Mismatch { requested: u32, served: u32 },

    /// Fault injection dropped the connection after sending `index`.
    InjectedDrop { index: u32 },

    /// The peer went away or stalled; `phase` is where it happened.
    ConnectionClosed { phase: String },
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitLogin,
    ResolveSession,
    ConfirmLogin,
    Stream { index: u32 },
    SendChecksum,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        match self {
            Phase::AwaitLogin => write!(f, "await-login"),
            Phase::ResolveSession => write!(f, "resolve-session"),
            Phase::ConfirmLogin => write!(f, "confirm-login"),
            Phase::Stream { index } => write!(f, "stream[{index}]"),
            Phase::SendChecksum => write!(f, "send-checksum"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionHandler
// ---------------------------------------------------------------------------

pub struct SessionHandler<S> {
    // ---
    stream: S,
    peer: String,
    store: SessionStore,
    faults: Arc<FaultInjector>,
    payloads: Arc<PayloadGenerator>,
    config: HandlerConfig,
    phase: Phase,
}

// ---

impl<S: TrickleStream> SessionHandler<S> {
    // ---
    pub fn new(
        stream: S,
        store: SessionStore,
        faults: Arc<FaultInjector>,
        payloads: Arc<PayloadGenerator>,
        config: HandlerConfig,
    ) -> Self {
        // ---
        let peer = stream.peer();
        Self {
            stream,
            peer,
            store,
            faults,
            payloads,
            config,
            phase: Phase::AwaitLogin,
        }
    }

    // ---

    /// Serve the connection to completion. Never fails; the outcome is the
    /// returned [`HandlerExit`].
    pub async fn run(mut self) -> HandlerExit {
        // ---
        let exit = match self.serve().await {
            Ok(exit) => exit,
            Err(e) => {
                tracing::warn!(peer = %self.peer, phase = %self.phase, "session ended: {e}");
                HandlerExit::ConnectionClosed {
                    phase: self.phase.to_string(),
                }
            }
        };

        if let Err(e) = self.stream.close().await {
            tracing::debug!(peer = %self.peer, "close failed: {e}");
        }
        exit
    }

    // ---

    async fn serve(&mut self) -> Result<HandlerExit> {
        // ---
        self.phase = Phase::AwaitLogin;
        let login: LoginRequest = self.recv().await?;
        let id = login.identity().to_string();
        tracing::info!(
            peer = %self.peer,
            identity = %id,
            count = login.count,
            packets_seen = login.packets_seen,
            "login received",
        );

        self.phase = Phase::ResolveSession;
        let session = Self::resolve(&self.store, &self.payloads, &id, login.count).await;

        self.phase = Phase::ConfirmLogin;
        let total = session.len();
        let sending_from = session.last_sent.min(login.packets_seen);
        self.send(&LoginConfirmed {
            sending_from,
            sending_total: total,
        })
        .await?;

        if total != login.count {
            tracing::warn!(
                identity = %id,
                requested = login.count,
                served = total,
                "requested length does not match stored session, dropping session",
            );
            self.store.erase(&id).await;
            return Ok(HandlerExit::Mismatch {
                requested: login.count,
                served: total,
            });
        }

        tracing::info!(identity = %id, sending_from, total, "streaming");

        let mut anchor = Instant::now();
        for index in sending_from..total {
            // ---
            self.phase = Phase::Stream { index };

            let value = session.payload[index as usize].wrapping_add(self.faults.corruption_delta());
            self.send(&DataPacket { payload: value }).await?;
            self.store.set_last_sent(&id, index).await;
            tracing::trace!(identity = %id, index, "sent");

            anchor += self.config.pace;
            sleep_until(anchor).await;

            if self.faults.should_drop_connection() {
                return Ok(HandlerExit::InjectedDrop { index });
            }
        }

        self.phase = Phase::SendChecksum;
        let checksum = checksum(&session.payload);
        self.send(&DataComplete { checksum }).await?;
        tracing::info!(identity = %id, checksum = %format_args!("0x{checksum:08X}"), "transfer complete");

        Ok(HandlerExit::Completed { checksum })
    }

    // ---

    /// Stored session for `id`, or a freshly generated one of `count`
    /// values. An empty stored payload counts as unseen.
    ///
    /// Borrows only the shared handles, never the stream, so the handler
    /// future stays `Send` for streams that are not `Sync`.
    async fn resolve(
        store: &SessionStore,
        payloads: &PayloadGenerator,
        id: &str,
        count: u32,
    ) -> Session {
        // ---
        match store.get(id).await {
            Some(session) if !session.is_empty() => {
                tracing::info!(identity = %id, last_sent = session.last_sent, "resuming session");
                session
            }
            _ => {
                tracing::info!(identity = %id, count, "new session");
                let payload = payloads.generate(count);
                store.register(id, payload).await
            }
        }
    }

    // ---

    async fn send<M: WireMessage>(&mut self, msg: &M) -> Result<()> {
        // ---
        timeout(self.config.io_timeout, send_msg(&mut self.stream, msg))
            .await
            .map_err(|_| timed_out::<M>("send", self.config.io_timeout))?
    }

    async fn recv<M: WireMessage>(&mut self) -> Result<M> {
        // ---
        timeout(self.config.io_timeout, recv_msg(&mut self.stream))
            .await
            .map_err(|_| timed_out::<M>("recv", self.config.io_timeout))?
    }
}

// ---

fn timed_out<M: WireMessage>(op: &str, after: Duration) -> TrickleError {
    TrickleError::ConnectionClosed(format!("{op} {} timed out after {after:?}", M::NAME))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
