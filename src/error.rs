//! Error types for name resolution.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving a name.
///
/// Variants carry their detail as strings so an outcome can be cloned to
/// every caller waiting on the same in-flight lookup.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The DNS lookup itself failed (transport error, malformed response,
    /// server refusal).
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// The lookup succeeded but returned no addresses for the name.
    #[error("no addresses returned for {0}")]
    NoAddress(String),

    /// The per-lookup deadline elapsed before a response arrived.
    #[error("lookup timed out after {0:?}")]
    TimedOut(Duration),

    /// The caller's operation context was cancelled.
    #[error("resolution cancelled")]
    Cancelled,

    /// Every configured DNS server failed; carries the last server's cause.
    #[error("all DNS servers failed: {0}")]
    AllServersFailed(#[source] Box<Error>),

    /// Invalid resolver configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
