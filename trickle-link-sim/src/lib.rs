//! In-process simulated transport for Trickle unit and integration testing.
//!
//! [`LinkSimTransport`] implements [`trickle_domain::TrickleTransport`] using
//! tokio channels instead of real sockets. [`LinkSimConfig`] controls
//! deterministic impairments:
//!
//! - Connection cuts: the k-th accepted connection is severed once the
//!   server has written a configured number of bytes to it
//! - Refused connects: the first few connect attempts fail
//!
//! Every impairment is scripted rather than random, so a test can place a
//! disconnect exactly between two protocol messages.
//!
//! # Quick start
//!
//! ```rust
//! use trickle_link_sim::{LinkSimConfig, LinkSimTransport};
//!
//! // Cut the first connection after 16 server→client bytes.
//! let transport = LinkSimTransport::new(LinkSimConfig::default().with_cuts([16]));
//! ```

mod config;
mod listener;
mod stream;
mod transport;

// --- public API
pub use config::LinkSimConfig;
pub use listener::LinkSimListener;
pub use stream::LinkSimStream;
pub use transport::LinkSimTransport;
