//! Error surface shared by every record-store backend.

use std::error::Error;
use thiserror::Error;

/// Result alias for record-store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by a record store regardless of the backing technology.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not service the request at all.
    #[error("record store unavailable: {message}")]
    Unavailable {
        /// Human-readable summary of what failed.
        message: String,
        /// Backend-specific failure cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
