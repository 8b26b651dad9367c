//! [`SessionStore`] — server-wide table of resumable sessions.
//!
//! One coarse lock covers the whole map. Every operation is a short,
//! I/O-free critical section; handlers never hold the lock across a socket
//! read or write, so a slow peer cannot stall other sessions.
//!
//! Sessions live in memory only and expire after `ttl` of inactivity. A
//! sweep is driven by the accept loop's idle tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// ---

use tokio::sync::Mutex;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Resumable transfer state for one client identity.
///
/// [`SessionStore::get`] hands out snapshots; the authoritative copy stays
/// in the store and is only mutated through store operations.
#[derive(Debug, Clone)]
pub struct Session {
    // ---
    /// Generated once at first login; never changes afterwards.
    pub payload: Arc<[u32]>,

    /// Index of the last value the server attempted to deliver.
    pub last_sent: u32,

    /// Registration time or the most recent `last_sent` update.
    pub last_seen: Instant,
}

// ---

impl Session {
    // ---
    pub fn len(&self) -> u32 {
        self.payload.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Cheap-clone handle; every clone shares the same table.
#[derive(Clone)]
pub struct SessionStore {
    // ---
    sessions: Arc<Mutex<HashMap<String, Session>>>,

    /// Idle time after which a session is swept.
    ttl: Duration,
}

// ---

impl SessionStore {
    // ---
    pub fn new(ttl: Duration) -> Self {
        // ---
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    // ---

    /// Insert a fresh session for `id` with `last_sent = 0`.
    ///
    /// Callers check [`Self::get`] first; an existing entry is replaced.
    pub async fn register(&self, id: &str, payload: Vec<u32>) -> Session {
        // ---
        let session = Session {
            payload: payload.into(),
            last_sent: 0,
            last_seen: Instant::now(),
        };
        self.sessions
            .lock()
            .await
            .insert(id.to_string(), session.clone());
        session
    }

    // ---

    /// Snapshot of the session for `id`; `None` means "never seen".
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }

    // ---

    /// Record that value `index` was sent and refresh `last_seen`.
    ///
    /// A session swept or erased mid-stream is not resurrected.
    pub async fn set_last_sent(&self, id: &str, index: u32) {
        // ---
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(id) {
            Some(session) => {
                session.last_sent = index;
                session.last_seen = Instant::now();
            }
            None => {
                tracing::debug!(identity = %id, index, "set_last_sent on unknown session ignored");
            }
        }
    }

    // ---

    /// Remove the session for `id`. Returns `true` if one existed.
    pub async fn erase(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    // ---

    /// Drop every session idle for longer than the TTL as of `now`.
    ///
    /// Returns the number removed.
    pub async fn remove_expired(&self, now: Instant) -> usize {
        // ---
        let ttl = self.ttl;
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();

        sessions.retain(|id, session| {
            let idle = now.saturating_duration_since(session.last_seen);
            if idle > ttl {
                tracing::info!(identity = %id, idle_secs = idle.as_secs(), "session expired, removing");
                return false;
            }
            true
        });

        before - sessions.len()
    }

    // ---

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
