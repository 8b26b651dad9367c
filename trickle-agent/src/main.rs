//! Trickle agent.
//!
//! Server role: hands out a random payload per client identity, one value
//! per second, resuming where a dropped client left off.
//! Client role: downloads one payload, reconnecting until the checksum
//! verifies.
//!
//! Usage:
//!   trickle-agent server
//!   trickle-agent client --uuid abc -n 5

use clap::Parser;
use tracing::{info, warn, Level};

// ---

use trickle_domain::TrickleTransport;
use trickle_tcp::TcpTransport;

// ---

mod client;
mod config;
mod fault;
mod framing;
mod handler;
mod payload;
mod server;
mod session_store;

#[cfg(test)]
mod scenarios;

// ---

use config::{Config, Mode};

// Gateway re-exports; siblings import via super::Symbol
pub use client::{ClientConfig, ClientDriver, Transfer};
pub use fault::{FaultConfig, FaultInjector};
pub use framing::{
    // ---
    recv_msg,
    send_msg,
    DataComplete,
    DataPacket,
    LoginConfirmed,
    LoginRequest,
    WireMessage,
};
pub use handler::{HandlerConfig, HandlerExit, SessionHandler};
pub use payload::PayloadGenerator;
pub use server::{Server, ServerConfig};
pub use session_store::{Session, SessionStore};

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---

    let cfg = Config::parse();

    let no_color = std::env::var("EMACS").is_ok()
        || std::env::var("NO_COLOR").is_ok()
        || std::env::var("CARGO_TERM_COLOR").as_deref() == Ok("never")
        || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(!no_color)
        .with_max_level(if cfg.verbose { Level::TRACE } else { Level::INFO })
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "trickle-agent starting");

    let faults = cfg.faults();
    if faults.flaky_connection != 0 {
        warn!("!!! FLAKY CONNECTION ACTIVE: 1 in {}", faults.flaky_connection);
    }
    if faults.flaky_data != 0 {
        warn!("!!! FLAKY DATA ACTIVE: 1 in {}", faults.flaky_data);
    }

    match &cfg.mode {
        Mode::Server => {
            let listener = TcpTransport.listen(cfg.port).await?;
            info!(port = cfg.port, "server listening");

            let server = Server::new(listener, FaultInjector::new(faults), cfg.server());

            tokio::select! {
                result = server.run() => result?,
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("shutting down");
                }
            }
        }

        Mode::Client { .. } => {
            let client_cfg = cfg
                .client()
                .ok_or_else(|| anyhow::anyhow!("client settings missing"))?;
            info!(
                identity = %client_cfg.identity,
                count = client_cfg.count,
                "client mode, connecting to {}:{}",
                client_cfg.host,
                client_cfg.port,
            );

            let driver = ClientDriver::new(TcpTransport, client_cfg, FaultInjector::new(faults));
            match driver.run().await {
                Ok(transfer) => {
                    info!(
                        count = transfer.payload.len(),
                        attempts = transfer.attempts,
                        checksum = %format_args!("0x{:08X}", transfer.checksum),
                        "download complete, checksum matches",
                    );
                }
                Err(e) => {
                    tracing::error!("download failed: {e}");
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
