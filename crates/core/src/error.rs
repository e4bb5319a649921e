// crates/core/src/error.rs
use thiserror::Error;

/// The daemon's error taxonomy. Every fallible operation, from store access
/// to wire decoding, ultimately classifies into one of these so the network
/// boundary and the background loops can apply a uniform policy.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input from the network, unknown query/event type, constraint
    /// violation. Returned to the calling peer; the connection continues.
    #[error("invalid: {0}")]
    Invalid(String),

    /// A required row is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store is closed or I/O is failing. Logged; in-flight requests get
    /// an error envelope, but the daemon does not self-terminate.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Temporary condition, e.g. EAGAIN on accept. Caller retries.
    #[error("transient: {0}")]
    Transient(String),

    /// Schema or blob unreadable.
    #[error("corrupt: {0}")]
    Corrupt(String),

    /// Config validation failure. Aborts startup.
    #[error("config: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors returned to a peer as an `error` envelope field rather than
    /// closing the connection (`Invalid`/`NotFound`/`Unavailable`/`Corrupt`),
    /// versus ones that only make sense on a background loop or accept path.
    pub fn is_peer_facing(&self) -> bool {
        matches!(
            self,
            Error::Invalid(_) | Error::NotFound(_) | Error::Unavailable(_) | Error::Corrupt(_)
        )
    }
}
