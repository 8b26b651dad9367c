//! [`ClientDriver`] — the client role's reconnecting transfer loop.
//!
//! Each attempt connects, logs in with the number of values already held,
//! and receives from the server's `sending_from` onward, overwriting any
//! redelivered values. Transient failures (connect refused, link cut,
//! injected drop) are retried after a fixed countdown with the accumulated
//! payload kept; everything else ends the run.

use std::time::Duration;

// ---

use trickle_domain::{checksum, Result, TrickleError, TrickleStream, TrickleTransport};

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
};

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClientConfig {
    // ---
    pub host: String,
    pub port: u16,

    /// Session key presented to the server.
    pub identity: String,

    /// Number of values requested.
    pub count: u32,

    /// Wait between a transient failure and the next attempt.
    pub retry_delay: Duration,

    /// Give up after this many attempts. `None` = retry forever.
    pub max_attempts: Option<u32>,
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    // ---
    pub payload: Vec<u32>,
    pub checksum: u32,

    /// Attempts made, including the successful one.
    pub attempts: u32,
}

// ---------------------------------------------------------------------------
// ClientDriver
// ---------------------------------------------------------------------------

pub struct ClientDriver<T> {
    // ---
    transport: T,
    config: ClientConfig,
    faults: FaultInjector,

    /// Values received so far; survives reconnects.
    payload: Vec<u32>,
}

// ---

impl<T: TrickleTransport> ClientDriver<T> {
    // ---
    pub fn new(transport: T, config: ClientConfig, faults: FaultInjector) -> Self {
        // ---
        Self {
            transport,
            config,
            faults,
            payload: Vec::new(),
        }
    }

    // ---

    /// Drive attempts until success, a terminal error, or `max_attempts`.
    pub async fn run(mut self) -> Result<Transfer> {
        // ---
        // Fail before touching the network.
        LoginRequest::new(&self.config.identity, self.config.count, 0)?;

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            tracing::info!(
                attempt = attempts,
                identity = %self.config.identity,
                have = self.payload.len(),
                want = self.config.count,
                "connecting to {}:{}",
                self.config.host,
                self.config.port,
            );

            let err = match self.attempt().await {
                Ok(checksum) => {
                    return Ok(Transfer {
                        payload: self.payload,
                        checksum,
                        attempts,
                    });
                }
                Err(e) => e,
            };

            if !err.is_transient() {
                return Err(err);
            }
            if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                tracing::error!(attempts, "giving up: {err}");
                return Err(err);
            }

            tracing::warn!(have = self.payload.len(), "attempt failed: {err}");
            self.countdown().await;
        }
    }

    // ---

    async fn countdown(&self) {
        // ---
        let mut remaining = self.config.retry_delay.as_secs();
        while remaining > 0 {
            tracing::info!("reconnecting in {remaining}...");
            tokio::time::sleep(Duration::from_secs(1)).await;
            remaining -= 1;
        }
        let rest = self.config.retry_delay - Duration::from_secs(self.config.retry_delay.as_secs());
        if !rest.is_zero() {
            tokio::time::sleep(rest).await;
        }
    }

    // ---

    /// One connection's worth of the protocol. Returns the verified checksum.
    async fn attempt(&mut self) -> Result<u32> {
        // ---
        let mut stream = self
            .transport
            .connect(&self.config.host, self.config.port)
            .await?;

        let result = self.exchange(&mut stream).await;

        if let Err(e) = stream.close().await {
            tracing::debug!("close failed: {e}");
        }
        result
    }

    // ---

    async fn exchange<S: TrickleStream>(&mut self, stream: &mut S) -> Result<u32> {
        // ---
        let seen = self.payload.len() as u32;
        let login = LoginRequest::new(&self.config.identity, self.config.count, seen)?;
        send_msg(stream, &login).await?;

        let confirmed: LoginConfirmed = recv_msg(stream).await?;
        if confirmed.sending_total != self.config.count {
            return Err(TrickleError::BadRequest {
                requested: self.config.count,
                served: confirmed.sending_total,
            });
        }
        if confirmed.sending_from > seen {
            return Err(TrickleError::Protocol(format!(
                "server resumes at {} but only {seen} values are held",
                confirmed.sending_from,
            )));
        }
        tracing::info!(
            sending_from = confirmed.sending_from,
            total = confirmed.sending_total,
            "login confirmed",
        );

        for index in confirmed.sending_from..confirmed.sending_total {
            // ---
            let packet: DataPacket = recv_msg(stream).await?;
            let value = packet.payload.wrapping_add(self.faults.corruption_delta());
            self.store(index, value)?;
            tracing::trace!(index, value, "received");

            if self.faults.should_drop_connection() {
                return Err(TrickleError::ConnectionClosed(format!(
                    "injected drop after value {index}"
                )));
            }
        }

        let complete: DataComplete = recv_msg(stream).await?;
        let local = checksum(&self.payload);
        if local != complete.checksum {
            return Err(TrickleError::CorruptedDownload {
                local,
                remote: complete.checksum,
            });
        }

        tracing::info!(
            count = self.payload.len(),
            checksum = %format_args!("0x{local:08X}"),
            "transfer verified",
        );
        Ok(local)
    }

    // ---

    /// Overwrite a redelivered value or append the next one.
    fn store(&mut self, index: u32, value: u32) -> Result<()> {
        // ---
        let index = index as usize;
        match index.cmp(&self.payload.len()) {
            std::cmp::Ordering::Less => self.payload[index] = value,
            std::cmp::Ordering::Equal => self.payload.push(value),
            std::cmp::Ordering::Greater => {
                return Err(TrickleError::Protocol(format!(
                    "value {index} arrived with only {} held",
                    self.payload.len()
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::time::Duration;

    use trickle_domain::TrickleError;
    use trickle_link_sim::{LinkSimConfig, LinkSimTransport};

    use super::{ClientConfig, ClientDriver};
    use crate::FaultInjector;

    // ---

    fn config(identity: &str, max_attempts: Option<u32>) -> ClientConfig {
        // ---
        ClientConfig {
            host: "localhost".into(),
            port: 9000,
            identity: identity.into(),
            count: 3,
            retry_delay: Duration::from_secs(3),
            max_attempts,
        }
    }

    // ---

    #[tokio::test]
    async fn oversized_identity_never_connects() {
        // ---
        let transport = LinkSimTransport::new(LinkSimConfig::perfect());
        let driver = ClientDriver::new(
            transport.clone(),
            config(&"x".repeat(41), None),
            FaultInjector::disabled(),
        );

        let err = driver.run().await.unwrap_err();
        assert!(matches!(err, TrickleError::BadIdentity { len: 41, max: 40 }));
        assert_eq!(transport.connect_attempts(), 0);
    }

    // ---

    /// With nobody listening every attempt is refused; the bound turns the
    /// last refusal into the result after the countdowns in between.
    #[tokio::test(start_paused = true)]
    async fn max_attempts_bounds_retries() {
        // ---
        let transport = LinkSimTransport::new(LinkSimConfig::perfect());
        let driver = ClientDriver::new(
            transport.clone(),
            config("abc", Some(3)),
            FaultInjector::disabled(),
        );

        let started = tokio::time::Instant::now();
        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, TrickleError::Connect { .. }), "got {err}");
        assert_eq!(transport.connect_attempts(), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(6) && waited < Duration::from_secs(7), "{waited:?}");
    }

    // ---

    #[test]
    fn store_overwrites_appends_and_rejects_gaps() {
        // ---
        let mut driver = ClientDriver::new(
            LinkSimTransport::new(LinkSimConfig::perfect()),
            config("abc", None),
            FaultInjector::disabled(),
        );

        driver.store(0, 5).unwrap();
        driver.store(1, 6).unwrap();
        driver.store(1, 7).unwrap();
        assert_eq!(driver.payload, vec![5, 7]);

        let err = driver.store(3, 9).unwrap_err();
        assert!(matches!(err, TrickleError::Protocol(_)));
        assert_eq!(driver.payload, vec![5, 7]);
    }
}
