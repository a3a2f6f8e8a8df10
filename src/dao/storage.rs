use std::error::Error;
use thiserror::Error;

/// Result alias for state-store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by state-store backends regardless of the underlying store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    #[error("state store unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failed operation.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A stored value could not be decoded into its entity type.
    #[error("corrupt record for key `{key}`")]
    Corrupt {
        /// Store key whose value failed to decode.
        key: String,
        /// Underlying decode failure.
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

    /// Construct a corrupt-record error for a store key.
    pub fn corrupt(key: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Corrupt {
            key,
            source: Box::new(source),
        }
    }
}
