//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Permanent failure; retrying cannot help.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// A generator returned something the handler cannot use.
    #[error("Unusable generator output: {0}")]
    InvalidOutput(String),

    #[error("Job timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Pipeline(#[from] studio_pipeline::PipelineError),

    #[error(transparent)]
    Provider(#[from] studio_providers::ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] studio_storage::StorageError),

    #[error("Store error: {0}")]
    Store(#[from] studio_store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] studio_queue::QueueError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn invalid_output(msg: impl Into<String>) -> Self {
        Self::InvalidOutput(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Generators are non-deterministic, so unparseable output is worth
    /// another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::JobFailed(_) => false,
            WorkerError::Pipeline(e) => e.is_retryable(),
            WorkerError::Provider(e) => e.is_retryable(),
            WorkerError::Storage(e) => e.is_retryable(),
            WorkerError::InvalidOutput(_)
            | WorkerError::Timeout(_)
            | WorkerError::Store(_)
            | WorkerError::Queue(_)
            | WorkerError::Json(_) => true,
        }
    }

    /// Text persisted on the failed row.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::JobFailed(msg) => msg.clone(),
            WorkerError::Pipeline(e) => e.user_message(),
            WorkerError::Provider(e) => e.user_message(),
            WorkerError::Timeout(_) => "Generation took too long".to_string(),
            WorkerError::InvalidOutput(_) | WorkerError::Json(_) => {
                "The text generator returned an unusable response".to_string()
            }
            WorkerError::Storage(_) => "Could not store generated media".to_string(),
            WorkerError::Store(_) | WorkerError::Queue(_) => {
                "Internal error while generating".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_pipeline::PipelineError;
    use studio_providers::{ProviderError, ProviderErrorKind};

    #[test]
    fn test_retry_classification() {
        assert!(!WorkerError::job_failed("no script").is_retryable());
        assert!(WorkerError::Timeout(30).is_retryable());
        assert!(WorkerError::invalid_output("not json").is_retryable());

        let rate_limited = ProviderError::new("openai", ProviderErrorKind::RateLimited, "slow down");
        assert!(WorkerError::from(rate_limited).is_retryable());
        let rejected = ProviderError::new("heygen", ProviderErrorKind::BadRequest, "bad avatar");
        assert!(!WorkerError::from(rejected).is_retryable());

        let integrity = PipelineError::data_integrity("two rows");
        assert!(!WorkerError::from(integrity).is_retryable());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = WorkerError::Timeout(1800);
        assert_eq!(err.user_message(), "Generation took too long");

        let err = WorkerError::from(ProviderError::new(
            "elevenlabs",
            ProviderErrorKind::Unauthorized,
            "HTTP 401: invalid key",
        ));
        assert!(err.user_message().starts_with("elevenlabs failed"));
    }
}
