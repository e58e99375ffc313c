//! Standalone videos (no source article, no submission).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::id::{OrganizationId, StandaloneVideoId};
use crate::lifecycle::GenerationState;
use crate::output::EntityRef;

/// Video generated from a prompt or a user-written script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StandaloneVideo {
    pub id: StandaloneVideoId,
    pub organization_id: OrganizationId,
    pub title: String,
    /// Prompt used to write a script when none was supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub config: GenerationConfig,
    #[serde(flatten)]
    pub state: GenerationState,
    #[serde(default)]
    pub version: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl StandaloneVideo {
    pub fn new(
        organization_id: OrganizationId,
        title: impl Into<String>,
        created_by: impl Into<String>,
        config: GenerationConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: StandaloneVideoId::new(),
            organization_id,
            title: title.into(),
            prompt: None,
            config,
            state: GenerationState::new(now),
            version: 0,
            created_by: created_by.into(),
            created_at: now,
        }
    }

    /// Set the prompt the script writer starts from.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Use a finished script and skip script generation.
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.state.script = Some(script.into());
        self
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Standalone(self.id.clone())
    }
}
