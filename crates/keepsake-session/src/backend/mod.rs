//! Backing-store contract for persisted session records.
//!
//! The engine never talks to a network client directly. It goes through the
//! [`Backend`] trait, which models a TTL-capable key-value store holding
//! opaque byte strings. Implementations classify their failures into
//! [`BackendError::Unreachable`] (the store could not be reached at all) and
//! [`BackendError::Command`] (the store answered with an error); only the
//! former is recovered by the failure policy.

use std::time::Duration;

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::{BackendStats, MemoryBackend};
#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;

/// Error reported by a backend client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached (refused, dropped, timed out).
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend was reached but rejected the command.
    #[error("backend command failed: {0}")]
    Command(String),
}

impl BackendError {
    /// Whether this error means the backend is down rather than misbehaving.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BackendError::Unreachable(_))
    }
}

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Trait for backing-store clients.
///
/// Implement this trait to connect the session store to a key-value backend.
/// Every call blocks the calling request for the duration of its round trip;
/// timeouts are the client's business.
pub trait Backend: Send + Sync {
    /// Whether a value is stored at `key`.
    fn exists(&self, key: &str) -> BackendResult<bool>;

    /// Fetch the bytes stored at `key`, or `None` if there are none.
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Store `value` at `key` without expiry.
    fn set(&self, key: &str, value: &[u8]) -> BackendResult<()>;

    /// Store `value` at `key`, expiring after `ttl`.
    fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> BackendResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unreachable_is_connectivity() {
        assert!(BackendError::Unreachable("connection refused".into()).is_connectivity());
        assert!(!BackendError::Command("WRONGTYPE".into()).is_connectivity());
    }
}
