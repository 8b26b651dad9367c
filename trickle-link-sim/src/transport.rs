use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ---

use async_trait::async_trait;
use tokio::sync::mpsc;

// ---

use trickle_domain::{Result, TrickleError, TrickleTransport};

// ---

use super::{LinkSimConfig, LinkSimListener, LinkSimStream};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Shared switchboard: which simulated ports are listening, plus the
/// counters that drive scripted impairments.
#[derive(Default)]
struct Registry {
    // ---
    ports: HashMap<u16, mpsc::UnboundedSender<LinkSimStream>>,

    /// Connect calls seen so far, refused or not.
    connect_attempts: usize,

    /// Connections handed to a listener so far; indexes `config.cuts`.
    established: usize,
}

// ---------------------------------------------------------------------------
// LinkSimTransport
// ---------------------------------------------------------------------------

/// In-process transport. Does not use real sockets.
///
/// Cloning is cheap and every clone shares one switchboard, so a test hands
/// one clone to the server and another to the client.
#[derive(Clone)]
pub struct LinkSimTransport {
    // ---
    config: LinkSimConfig,
    registry: Arc<Mutex<Registry>>,
}

// ---

impl LinkSimTransport {
    // ---
    pub fn new(config: LinkSimConfig) -> Self {
        // ---
        Self {
            config,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    // ---

    /// Number of `connect` calls made through any clone of this transport.
    pub fn connect_attempts(&self) -> usize {
        // ---
        self.registry
            .lock()
            .map(|r| r.connect_attempts)
            .unwrap_or_default()
    }

    // ---

    /// Number of connections that reached a listener.
    pub fn established(&self) -> usize {
        // ---
        self.registry
            .lock()
            .map(|r| r.established)
            .unwrap_or_default()
    }

    // ---

    fn registry(&self) -> Result<std::sync::MutexGuard<'_, Registry>> {
        // ---
        self.registry
            .lock()
            .map_err(|_| TrickleError::Transport("link-sim registry poisoned".into()))
    }
}

// ---

#[async_trait]
impl TrickleTransport for LinkSimTransport {
    // ---
    type Stream = LinkSimStream;
    type Listener = LinkSimListener;

    async fn connect(&self, host: &str, port: u16) -> Result<LinkSimStream> {
        // ---
        let mut registry = self.registry()?;
        registry.connect_attempts += 1;

        let refused = |reason: &str| TrickleError::Connect {
            addr: format!("{host}:{port}"),
            reason: reason.to_string(),
        };

        if registry.connect_attempts <= self.config.refused_connects {
            return Err(refused("connection refused (scripted)"));
        }

        let cut = self.config.cuts.get(registry.established).copied();
        let (client, server) = LinkSimStream::pair(cut);

        let tx = registry
            .ports
            .get(&port)
            .ok_or_else(|| refused("connection refused"))?;
        tx.send(server)
            .map_err(|_| refused("listener dropped"))?;

        registry.established += 1;
        tracing::debug!(port, ?cut, "link-sim: connection established");

        Ok(client)
    }

    // ---

    async fn listen(&self, port: u16) -> Result<LinkSimListener> {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry()?;

        if registry.ports.get(&port).is_some_and(|tx| !tx.is_closed()) {
            return Err(TrickleError::Transport(format!(
                "link-sim port {port} already in use"
            )));
        }
        registry.ports.insert(port, tx);

        Ok(LinkSimListener::new(port, rx))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
