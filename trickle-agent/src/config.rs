//! CLI configuration for `trickle-agent`.
//!
//! Run modes:
//!   trickle-agent [--port 9000] [-v] [--flaky-connection N] [--flaky-data N] server
//!   trickle-agent [--port 9000] client [--uuid ID] [-n COUNT] [--host localhost]

use clap::{Parser, Subcommand};
use rand::Rng;

// ---

use super::{ClientConfig, FaultConfig, ServerConfig};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "trickle-agent", about = "Resumable paced transfer of random values")]
pub struct Config {
    // ---
    #[command(subcommand)]
    pub mode: Mode,

    /// TCP port the server listens on and the client connects to.
    #[arg(long, global = true, default_value_t = 9000)]
    pub port: u16,

    /// Enable trace-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Drop the connection with a 1-in-N chance per data packet. 0 disables.
    #[arg(long, global = true, default_value_t = 0)]
    pub flaky_connection: u32,

    /// Corrupt a data value with a 1-in-N chance per packet. 0 disables.
    #[arg(long, global = true, default_value_t = 0)]
    pub flaky_data: u32,

    /// Seed for fault injection; random when omitted.
    #[arg(long, global = true)]
    pub fault_seed: Option<u64>,
}

// ---

#[derive(Debug, Subcommand)]
pub enum Mode {
    // ---
    /// Serve sessions until interrupted.
    Server,

    /// Download one session, reconnecting as needed.
    Client {
        // ---
        /// Session identity, at most 40 bytes. Defaults to a random UUID.
        #[arg(long)]
        uuid: Option<String>,

        /// Number of values to request. Defaults to a random count in 1..=65535.
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Server host name or address.
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Stop after this many attempts instead of retrying forever.
        #[arg(long)]
        max_attempts: Option<u32>,
    },
}

// ---

impl Config {
    // ---
    pub fn faults(&self) -> FaultConfig {
        // ---
        FaultConfig {
            flaky_connection: self.flaky_connection,
            flaky_data: self.flaky_data,
            seed: self.fault_seed,
        }
    }

    // ---

    pub fn server(&self) -> ServerConfig {
        ServerConfig::default()
    }

    // ---

    /// Client settings with defaults filled in. `None` in server mode.
    pub fn client(&self) -> Option<ClientConfig> {
        // ---
        let Mode::Client {
            uuid,
            count,
            host,
            max_attempts,
        } = &self.mode
        else {
            return None;
        };

        Some(ClientConfig {
            host: host.clone(),
            port: self.port,
            identity: uuid
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            count: count.unwrap_or_else(|| rand::thread_rng().gen_range(1..=0xFFFF)),
            retry_delay: std::time::Duration::from_secs(3),
            max_attempts: *max_attempts,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use clap::Parser;

    use super::{Config, Mode};

    // ---

    #[test]
    fn server_defaults() {
        // ---
        let cfg = Config::try_parse_from(["trickle-agent", "server"]).unwrap();
        assert!(matches!(cfg.mode, Mode::Server));
        assert_eq!(cfg.port, 9000);
        assert!(!cfg.verbose);
        assert!(!cfg.faults().is_active());
        assert!(cfg.client().is_none());
    }

    // ---

    /// Global flags are accepted after the subcommand too.
    #[test]
    fn client_flags() {
        // ---
        let cfg = Config::try_parse_from([
            "trickle-agent",
            "--flaky-data",
            "4",
            "client",
            "--uuid",
            "abc",
            "-n",
            "5",
            "--port",
            "9100",
            "-v",
        ])
        .unwrap();

        assert!(cfg.verbose);
        assert_eq!(cfg.faults().flaky_data, 4);
        assert_eq!(cfg.faults().flaky_connection, 0);

        let client = cfg.client().unwrap();
        assert_eq!(client.identity, "abc");
        assert_eq!(client.count, 5);
        assert_eq!(client.port, 9100);
        assert_eq!(client.host, "localhost");
        assert_eq!(client.max_attempts, None);
    }

    // ---

    #[test]
    fn client_defaults_are_random() {
        // ---
        let cfg = Config::try_parse_from(["trickle-agent", "client"]).unwrap();
        let client = cfg.client().unwrap();

        assert_eq!(client.identity.len(), 36);
        assert!((1..=0xFFFF).contains(&client.count));
    }

    // ---

    #[test]
    fn missing_mode_is_rejected() {
        assert!(Config::try_parse_from(["trickle-agent"]).is_err());
    }
}
