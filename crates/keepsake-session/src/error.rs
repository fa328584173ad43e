//! Error types for session store operations.

use crate::backend::BackendError;
use crate::codec::{DecodeError, EncodeError};

/// Error type for session store operations.
///
/// Connectivity failures never show up here: the engine recovers from them
/// locally. What remains are backend command errors, codec errors that could
/// not be recovered, and configuration mistakes caught at construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend answered with an error that is not a connectivity failure.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Stored bytes could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A record could not be encoded for storage.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The store was configured incorrectly.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
