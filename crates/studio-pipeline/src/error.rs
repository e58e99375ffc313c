//! Pipeline error taxonomy.

use studio_models::TransitionError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed caller input.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Operation attempted from a state that forbids it.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] TransitionError),

    #[error(transparent)]
    Provider(#[from] studio_providers::ProviderError),

    /// Async provider never responded.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Provider handle resolved to zero or several rows.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    /// Conditional write kept losing to concurrent writers.
    #[error("Concurrent update on {0} did not settle")]
    Contended(String),

    #[error("Store error: {0}")]
    Store(#[from] studio_store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] studio_queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] studio_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] studio_media::MediaError),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn data_integrity(msg: impl Into<String>) -> Self {
        Self::DataIntegrity(msg.into())
    }

    /// Whether running the same job again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Provider(e) => e.is_retryable(),
            PipelineError::Storage(e) => e.is_retryable(),
            PipelineError::Media(e) => e.is_retryable(),
            PipelineError::Store(_) | PipelineError::Queue(_) | PipelineError::Contended(_) => {
                true
            }
            PipelineError::Validation(_)
            | PipelineError::NotFound { .. }
            | PipelineError::AccessDenied(_)
            | PipelineError::InvalidStateTransition(_)
            | PipelineError::Timeout(_)
            | PipelineError::DataIntegrity(_) => false,
        }
    }

    /// Message persisted on a FAILED row. Never includes internal detail
    /// beyond what the failing collaborator reported.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Provider(e) => e.user_message(),
            PipelineError::Media(e) => format!("Media processing failed: {}", e),
            PipelineError::Storage(_) => "Could not store generated media".to_string(),
            PipelineError::Store(_) | PipelineError::Queue(_) | PipelineError::Contended(_) => {
                "Internal error while generating".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_models::OutputStatus;
    use studio_providers::{ProviderError, ProviderErrorKind};

    #[test]
    fn test_retryable_follows_provider_kind() {
        let limited: PipelineError =
            ProviderError::new("heygen", ProviderErrorKind::RateLimited, "slow down").into();
        let rejected: PipelineError =
            ProviderError::new("heygen", ProviderErrorKind::BadRequest, "bad avatar").into();
        assert!(limited.is_retryable());
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_domain_rejections_are_permanent() {
        let err: PipelineError = TransitionError::Invalid {
            from: OutputStatus::Pending,
            event: "approve_script",
        }
        .into();
        assert!(!err.is_retryable());
        assert!(!PipelineError::validation("empty").is_retryable());
        assert!(!PipelineError::data_integrity("two rows").is_retryable());
    }

    #[test]
    fn test_user_message_hides_infrastructure_detail() {
        let err: PipelineError = studio_store::StoreError::backend("connection reset").into();
        assert_eq!(err.user_message(), "Internal error while generating");
    }
}
