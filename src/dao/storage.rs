use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of where the quiz document lives.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be read from or written to.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable context for the failed operation.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The stored document was readable but violates the quiz store invariants.
    #[error("corrupt quiz store: {message}")]
    Corrupt {
        /// Description of the violated invariant.
        message: String,
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

    /// Construct a corruption error describing the broken invariant.
    pub fn corrupt(message: impl Into<String>) -> Self {
        StorageError::Corrupt {
            message: message.into(),
        }
    }
}
