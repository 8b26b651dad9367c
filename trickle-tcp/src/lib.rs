//! TCP transport for Trickle.
//!
//! Implements [`trickle_domain::TrickleTransport`] on top of `tokio::net`.
//!
//! # Quick start
//!
//! ```ignore
//! use trickle_domain::{TrickleListener, TrickleTransport};
//! use trickle_tcp::TcpTransport;
//!
//! // --- server side ---
//! let mut listener = TcpTransport.listen(9000).await?;
//! let stream = listener.accept().await?;
//!
//! // --- client side ---
//! let stream = TcpTransport.connect("localhost", 9000).await?;
//! ```

mod error;
mod listener;
mod stream;
mod transport;

pub use error::TcpError;
pub use listener::TcpPortListener;
pub use stream::TcpLink;
pub use transport::TcpTransport;
