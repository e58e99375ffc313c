//! Queue errors.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue broker unreachable: {0}")]
    Unreachable(String),

    #[error("Could not publish job: {0}")]
    Publish(String),

    /// The delivery was already acked, dead-lettered or never handed out.
    #[error("No pending delivery {0}")]
    UnknownDelivery(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed job payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl QueueError {
    pub fn unreachable(msg: impl ToString) -> Self {
        Self::Unreachable(msg.to_string())
    }

    pub fn publish(msg: impl ToString) -> Self {
        Self::Publish(msg.to_string())
    }

    /// Broker unreachable or timed out; the caller may try again later.
    pub fn is_unavailable(&self) -> bool {
        match self {
            QueueError::Unreachable(_) => true,
            QueueError::Redis(e) => e.is_io_error() || e.is_timeout() || e.is_connection_dropped(),
            _ => false,
        }
    }
}
