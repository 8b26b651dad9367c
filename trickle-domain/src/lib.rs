//! Core traits, types, and checksum for the Trickle resumable stream.
//!
//! This crate defines the vocabulary of the system. All other crates depend
//! on `trickle-domain` and speak its types. No transport implementations
//! live here.
//!
//! # Structure
//!
//! - `error`     — [`TrickleError`] and [`Result<T>`] alias
//! - `transport` — [`TrickleStream`], [`TrickleListener`], [`TrickleTransport`] traits
//! - `checksum`  — [`checksum()`] over a payload sequence

mod checksum;
mod error;
mod transport;

// --- error
pub use error::{Result, TrickleError};

// --- transport
pub use transport::{
    // ---
    Readiness,
    TrickleListener,
    TrickleStream,
    TrickleTransport,
};

// --- checksum
pub use checksum::checksum;
