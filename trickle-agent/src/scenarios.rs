//! End-to-end runs of client and server over the simulated link.
//!
//! Time is paused, so the one-second pacing, the three-second reconnect
//! countdown and session expiry all complete instantly.

use std::time::Duration;

// ---

use tokio::task::JoinHandle;

// ---

use trickle_domain::{checksum, TrickleError, TrickleTransport};
use trickle_link_sim::{LinkSimConfig, LinkSimTransport};

// ---

use super::{
    // ---
    ClientConfig,
    ClientDriver,
    FaultConfig,
    FaultInjector,
    Server,
    ServerConfig,
    SessionStore,
};

const PORT: u16 = 9000;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    // ---
    transport: LinkSimTransport,
    store: SessionStore,
    server: JoinHandle<()>,
}

impl Harness {
    // ---
    async fn start(link: LinkSimConfig, server_faults: FaultConfig) -> Self {
        // ---
        let transport = LinkSimTransport::new(link);
        let listener = transport.listen(PORT).await.unwrap();
        let server = Server::new(
            listener,
            FaultInjector::new(server_faults),
            ServerConfig {
                payload_seed: Some(11),
                ..ServerConfig::default()
            },
        );
        let store = server.store();
        let server = tokio::spawn(async move {
            let _ = server.run().await;
        });

        Self {
            transport,
            store,
            server,
        }
    }

    // ---

    fn client(&self, identity: &str, count: u32) -> ClientDriver<LinkSimTransport> {
        self.client_with_faults(identity, count, FaultConfig::default())
    }

    fn client_with_faults(
        &self,
        identity: &str,
        count: u32,
        faults: FaultConfig,
    ) -> ClientDriver<LinkSimTransport> {
        // ---
        ClientDriver::new(
            self.transport.clone(),
            ClientConfig {
                host: "localhost".into(),
                port: PORT,
                identity: identity.into(),
                count,
                retry_delay: Duration::from_secs(3),
                max_attempts: None,
            },
            FaultInjector::new(faults),
        )
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// "abc", N = 5, clean link: one attempt, the server's payload, paced at
/// one value per second.
#[tokio::test(start_paused = true)]
async fn clean_transfer() {
    // ---
    let harness = Harness::start(LinkSimConfig::perfect(), FaultConfig::default()).await;

    let started = tokio::time::Instant::now();
    let transfer = harness.client("abc", 5).run().await.unwrap();

    assert_eq!(transfer.attempts, 1);
    assert_eq!(transfer.payload.len(), 5);
    assert_eq!(transfer.checksum, checksum(&transfer.payload));
    assert!(started.elapsed() >= Duration::from_secs(5));

    let session = harness.store.get("abc").await.unwrap();
    assert_eq!(&*session.payload, transfer.payload.as_slice());
}

// ---

/// The link is cut after the confirmation and two values. The server has
/// recorded `last_sent = 1`, the client holds two values, so the second
/// attempt resumes at 1 and redelivers it.
///
/// Timeline: values 0 and 1 go out at t=0 and t=1, the write of value 2
/// fails at t=2, the countdown ends at t=5, and values 1..=4 are paced out
/// again so the checksum arrives at t=9. Resuming at 0 would take until
/// t=10 and resuming at 2 would finish at t=8.
#[tokio::test(start_paused = true)]
async fn cut_link_resumes_from_last_sent() {
    // ---
    let link = LinkSimConfig::perfect().with_cuts([16]);
    let harness = Harness::start(link, FaultConfig::default()).await;

    let started = tokio::time::Instant::now();
    let client = tokio::spawn(harness.client("abc", 5).run());

    // Mid-countdown: the first connection is gone, the second not yet made.
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(harness.transport.established(), 1);
    assert_eq!(harness.store.get("abc").await.unwrap().last_sent, 1);

    let transfer = client.await.unwrap().unwrap();
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(9) && elapsed < Duration::from_secs(10),
        "{elapsed:?}"
    );

    assert_eq!(transfer.attempts, 2);
    assert_eq!(harness.transport.established(), 2);

    let session = harness.store.get("abc").await.unwrap();
    assert_eq!(&*session.payload, transfer.payload.as_slice());
    assert_eq!(session.last_sent, 4);
    assert_eq!(transfer.checksum, checksum(&session.payload));
}

// ---

#[tokio::test(start_paused = true)]
async fn zero_length_transfer() {
    // ---
    let harness = Harness::start(LinkSimConfig::perfect(), FaultConfig::default()).await;

    let transfer = harness.client("empty", 0).run().await.unwrap();

    assert!(transfer.payload.is_empty());
    assert_eq!(transfer.checksum, 0);
}

// ---

/// After more than the TTL of inactivity the session is purged, and the
/// same identity gets a fresh payload.
#[tokio::test(start_paused = true)]
async fn expired_session_gets_new_payload() {
    // ---
    let harness = Harness::start(LinkSimConfig::perfect(), FaultConfig::default()).await;

    let first = harness.client("abc", 3).run().await.unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert!(harness.store.get("abc").await.is_none());

    let second = harness.client("abc", 3).run().await.unwrap();
    assert_ne!(first.payload, second.payload);
    assert_eq!(second.checksum, checksum(&second.payload));
}

// ---

/// A completed session that has not expired is served again unchanged.
#[tokio::test(start_paused = true)]
async fn repeat_login_before_expiry_sees_same_payload() {
    // ---
    let harness = Harness::start(LinkSimConfig::perfect(), FaultConfig::default()).await;

    let first = harness.client("abc", 3).run().await.unwrap();
    let second = harness.client("abc", 3).run().await.unwrap();

    assert_eq!(first.payload, second.payload);
}

// ---

#[tokio::test(start_paused = true)]
async fn oversized_identity_is_rejected_locally() {
    // ---
    let harness = Harness::start(LinkSimConfig::perfect(), FaultConfig::default()).await;

    let err = harness.client(&"x".repeat(41), 5).run().await.unwrap_err();

    assert!(matches!(err, TrickleError::BadIdentity { .. }));
    assert_eq!(harness.transport.connect_attempts(), 0);
}

// ---

/// Stored length 3, request 5: a clean BadRequest with no values received,
/// and the stale session is dropped.
#[tokio::test(start_paused = true)]
async fn length_mismatch_is_bad_request() {
    // ---
    let harness = Harness::start(LinkSimConfig::perfect(), FaultConfig::default()).await;
    harness.store.register("abc", vec![1, 2, 3]).await;

    let err = harness.client("abc", 5).run().await.unwrap_err();

    assert!(matches!(
        err,
        TrickleError::BadRequest {
            requested: 5,
            served: 3
        }
    ));
    assert_eq!(harness.transport.connect_attempts(), 1);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(harness.store.get("abc").await.is_none());
}

// ---

/// Client-side corruption on every value makes the checksum disagree,
/// which is terminal.
#[tokio::test(start_paused = true)]
async fn client_corruption_is_detected() {
    // ---
    let harness = Harness::start(LinkSimConfig::perfect(), FaultConfig::default()).await;
    let faults = FaultConfig {
        flaky_connection: 0,
        flaky_data: 1,
        seed: Some(2),
    };

    let err = harness
        .client_with_faults("abc", 4, faults)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, TrickleError::CorruptedDownload { .. }), "got {err}");
}

// ---

/// Refused connections are retried after the countdown.
#[tokio::test(start_paused = true)]
async fn refused_connects_are_retried() {
    // ---
    let harness = Harness::start(
        LinkSimConfig::perfect().with_refused_connects(2),
        FaultConfig::default(),
    )
    .await;

    let started = tokio::time::Instant::now();
    let transfer = harness.client("abc", 2).run().await.unwrap();

    assert_eq!(transfer.attempts, 3);
    assert_eq!(harness.transport.connect_attempts(), 3);
    assert!(started.elapsed() >= Duration::from_secs(6 + 2));
}

// ---

/// Server-side drops on a flaky link still converge: each reconnect
/// resumes where the server left off until the checksum verifies.
#[tokio::test(start_paused = true)]
async fn flaky_server_connection_converges() {
    // ---
    let faults = FaultConfig {
        flaky_connection: 3,
        flaky_data: 0,
        seed: Some(17),
    };
    let harness = Harness::start(LinkSimConfig::perfect(), faults).await;

    let transfer = harness.client("abc", 12).run().await.unwrap();

    let session = harness.store.get("abc").await.unwrap();
    assert_eq!(&*session.payload, transfer.payload.as_slice());
    assert_eq!(transfer.checksum, checksum(&session.payload));
}

// ---

/// Client-side drop injection ends attempts early; each reconnect resumes
/// with the values already held until the transfer verifies.
#[tokio::test(start_paused = true)]
async fn flaky_client_connection_converges() {
    // ---
    let harness = Harness::start(LinkSimConfig::perfect(), FaultConfig::default()).await;
    let faults = FaultConfig {
        flaky_connection: 3,
        flaky_data: 0,
        seed: Some(4),
    };

    let transfer = harness
        .client_with_faults("abc", 10, faults)
        .run()
        .await
        .unwrap();

    assert!(transfer.attempts > 1, "attempts {}", transfer.attempts);
    assert_eq!(transfer.payload.len(), 10);

    let session = harness.store.get("abc").await.unwrap();
    assert_eq!(&*session.payload, transfer.payload.as_slice());
    assert_eq!(transfer.checksum, checksum(&session.payload));
}
