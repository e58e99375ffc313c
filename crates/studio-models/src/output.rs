//! Generated outputs belonging to a submission.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GenerationConfig;
use crate::id::{OrganizationId, OutputId, StandaloneVideoId, SubmissionId};
use crate::lifecycle::GenerationState;

/// Kind of generated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Audio,
    Video,
    Podcast,
    Quiz,
    InteractivePodcast,
}

impl OutputKind {
    pub const ALL: [OutputKind; 5] = [
        OutputKind::Audio,
        OutputKind::Video,
        OutputKind::Podcast,
        OutputKind::Quiz,
        OutputKind::InteractivePodcast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Audio => "audio",
            OutputKind::Video => "video",
            OutputKind::Podcast => "podcast",
            OutputKind::Quiz => "quiz",
            OutputKind::InteractivePodcast => "interactive_podcast",
        }
    }

    /// Video and podcast generate a script as a separate stage, which
    /// can be held at SCRIPT_READY for approval.
    pub fn supports_script_approval(&self) -> bool {
        matches!(self, OutputKind::Video | OutputKind::Podcast)
    }

    /// Only video completes through asynchronous provider callbacks.
    pub fn awaits_provider_callbacks(&self) -> bool {
        matches!(self, OutputKind::Video)
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Produced artifact of a completed output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// Final media location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Kind-specific payload (quiz questions, interactive segments)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl Artifact {
    /// Artifact that is just a media file.
    pub fn media(url: impl Into<String>) -> Self {
        Self {
            media_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Artifact that is just structured data.
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, duration_secs: Option<f64>) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_transcript(mut self, transcript: Option<String>) -> Self {
        self.transcript = transcript;
        self
    }
}

/// Reference to any row driven by the generation state machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Output(OutputId),
    Standalone(StandaloneVideoId),
}

impl EntityRef {
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Output(id) => id.as_str(),
            EntityRef::Standalone(id) => id.as_str(),
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityRef::Output(_) => "output",
            EntityRef::Standalone(_) => "standalone_video",
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table(), self.id())
    }
}

/// A single generated output of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Output {
    pub id: OutputId,
    pub submission_id: SubmissionId,
    pub organization_id: OrganizationId,
    pub kind: OutputKind,
    #[serde(default)]
    pub config: GenerationConfig,
    #[serde(flatten)]
    pub state: GenerationState,
    /// Optimistic concurrency version, bumped by the store on every write
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Output {
    /// Create a PENDING output row.
    pub fn new(
        submission_id: SubmissionId,
        organization_id: OrganizationId,
        kind: OutputKind,
        config: GenerationConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OutputId::new(),
            submission_id,
            organization_id,
            kind,
            config,
            state: GenerationState::new(now),
            version: 0,
            created_at: now,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Output(self.id.clone())
    }
}
