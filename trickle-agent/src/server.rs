//! [`Server`] — accept loop and housekeeping for the server role.
//!
//! The loop waits up to one idle tick for a connection. A ready listener
//! is accepted and handed to a fresh [`SessionHandler`] task; an idle tick
//! sweeps expired sessions and reaps finished handlers. Readiness and
//! accept failures end the loop and propagate to the caller.

use std::sync::Arc;
use std::time::Duration;

// ---

use tokio::task::JoinSet;
use tokio::time::Instant;

// ---

use trickle_domain::{Readiness, Result, TrickleListener, TrickleStream};

// ---

use super::{
    // ---
    FaultInjector,
    HandlerConfig,
    HandlerExit,
    PayloadGenerator,
    SessionHandler,
    SessionStore,
};

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    // ---
    /// Per-handler pacing and I/O bounds.
    pub handler: HandlerConfig,

    /// Idle time after which a session is forgotten.
    pub session_ttl: Duration,

    /// How long one readiness wait lasts before housekeeping runs.
    pub idle_tick: Duration,

    /// Seed for payload generation. `None` = from entropy.
    pub payload_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            handler: HandlerConfig::default(),
            session_ttl: Duration::from_secs(30),
            idle_tick: Duration::from_secs(1),
            payload_seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct Server<L> {
    // ---
    listener: L,
    store: SessionStore,
    faults: Arc<FaultInjector>,
    payloads: Arc<PayloadGenerator>,
    config: ServerConfig,
    workers: JoinSet<HandlerExit>,
}

// ---

impl<L: TrickleListener> Server<L> {
    // ---
    pub fn new(listener: L, faults: FaultInjector, config: ServerConfig) -> Self {
        // ---
        Self {
            listener,
            store: SessionStore::new(config.session_ttl),
            faults: Arc::new(faults),
            payloads: Arc::new(PayloadGenerator::new(config.payload_seed)),
            config,
            workers: JoinSet::new(),
        }
    }

    // ---

    /// Handle onto the session table, shared with every handler.
    pub fn store(&self) -> SessionStore {
        self.store.clone()
    }

    // ---

    /// Handlers spawned and not yet reaped.
    pub fn active_workers(&self) -> usize {
        self.workers.len()
    }

    // ---

    /// Run until the listener fails. Never returns `Ok`.
    pub async fn run(mut self) -> Result<()> {
        // ---
        tracing::info!(
            ttl_secs = self.config.session_ttl.as_secs(),
            "accepting connections",
        );

        loop {
            self.step().await?;
        }
    }

    // ---

    /// One iteration of the accept loop.
    async fn step(&mut self) -> Result<Readiness> {
        // ---
        let readiness = self.listener.wait_readable(self.config.idle_tick).await?;

        match readiness {
            Readiness::Idle => {
                let expired = self.store.remove_expired(Instant::now()).await;
                if expired > 0 {
                    let live = self.store.len().await;
                    tracing::debug!(expired, live, "sessions swept");
                }
                self.reap();
            }
            Readiness::Ready => {
                let stream = self.listener.accept().await?;
                tracing::info!(peer = %stream.peer(), "connection accepted");

                let handler = SessionHandler::new(
                    stream,
                    self.store.clone(),
                    Arc::clone(&self.faults),
                    Arc::clone(&self.payloads),
                    self.config.handler,
                );
                self.workers.spawn(handler.run());
            }
        }

        Ok(readiness)
    }

    // ---

    /// Collect handlers that have already finished, without waiting.
    fn reap(&mut self) {
        // ---
        while let Some(joined) = self.workers.try_join_next() {
            match joined {
                Ok(exit) => tracing::debug!(?exit, "handler finished"),
                Err(e) if e.is_panic() => tracing::error!("handler panicked: {e}"),
                Err(e) => tracing::warn!("handler cancelled: {e}"),
            }
            tracing::trace!(active = self.active_workers(), "handler reaped");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
