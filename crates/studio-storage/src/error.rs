//! Storage errors.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage is misconfigured: {0}")]
    Config(String),

    #[error("Key segment {0:?} is not allowed")]
    InvalidKey(String),

    #[error("Could not publish {key}: {message}")]
    Publish { key: String, message: String },

    #[error("Bucket unreachable: {0}")]
    Unreachable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn missing_var(name: &str) -> Self {
        Self::Config(format!("{name} not set"))
    }

    pub fn publish(key: &str, message: impl ToString) -> Self {
        Self::Publish {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    /// A bad key or missing credentials fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StorageError::Config(_) | StorageError::InvalidKey(_))
    }
}
