//! Media tooling errors.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} is not installed or not on PATH")]
    ToolMissing(&'static str),

    /// `stderr` holds the tail of the tool's output, when it wrote any.
    #[error("{tool} exited with {}", exit_code.map_or("a signal".to_string(), |c| format!("code {c}")))]
    ToolFailed {
        tool: &'static str,
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    #[error("Could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No such media file: {0}")]
    FileNotFound(PathBuf),

    #[error("Render exceeded {0}s")]
    Timeout(u64),

    #[error("Cannot composite: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable probe output: {0}")]
    ProbeOutput(#[from] serde_json::Error),
}

impl MediaError {
    pub fn tool_failed(tool: &'static str, exit_code: Option<i32>, stderr: Option<String>) -> Self {
        Self::ToolFailed {
            tool,
            exit_code,
            stderr,
        }
    }

    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Fetches, timeouts and disk hiccups can succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MediaError::Fetch { .. } | MediaError::Timeout(_) | MediaError::Io(_)
        )
    }
}
