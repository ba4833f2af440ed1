//! Shared infrastructure for Waypost services.
//!
//! Currently this is the syndication-feed client (HTTP fetch with retry,
//! RSS item extraction, in-memory TTL cache) and the common error type that
//! application crates wrap via `#[from]`.

pub mod error;
pub mod feed;
