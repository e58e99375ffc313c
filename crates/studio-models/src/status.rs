//! Output and submission status enums.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single generated output (or standalone video).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputStatus {
    /// Row created, no work started
    #[default]
    Pending,
    /// A generation job is queued or running, or a provider callback is awaited
    Processing,
    /// Script generated and waiting for human approval (video/podcast only)
    ScriptReady,
    /// Artifact produced
    Completed,
    /// Generation failed; `error` holds the reason
    Failed,
}

impl OutputStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStatus::Pending => "PENDING",
            OutputStatus::Processing => "PROCESSING",
            OutputStatus::ScriptReady => "SCRIPT_READY",
            OutputStatus::Completed => "COMPLETED",
            OutputStatus::Failed => "FAILED",
        }
    }

    /// Terminal rows accept no further automated transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutputStatus::Completed | OutputStatus::Failed)
    }

    /// Whether work on this row has begun.
    pub fn is_started(&self) -> bool {
        !matches!(self, OutputStatus::Pending)
    }
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rollup status of a submission, derived from its outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Processing,
    PartialComplete,
    Completed,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Processing => "PROCESSING",
            SubmissionStatus::PartialComplete => "PARTIAL_COMPLETE",
            SubmissionStatus::Completed => "COMPLETED",
            SubmissionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
