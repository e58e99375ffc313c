//! Per-output generation configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::AssetId;

fn default_music_volume() -> f32 {
    0.15
}

/// Generation settings persisted on an output or standalone video.
///
/// Post-processing and caption routing are decided from these persisted
/// values, never from anything a provider sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationConfig {
    /// Pause at SCRIPT_READY until a human approves the script
    #[serde(default)]
    pub script_approval: bool,
    /// Clip prepended to the finished video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_bumper_id: Option<AssetId>,
    /// Clip appended to the finished video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_bumper_id: Option<AssetId>,
    /// Music mixed under the finished video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music_id: Option<AssetId>,
    /// Music gain relative to the main track (0.0 - 1.0)
    #[serde(default = "default_music_volume")]
    pub music_volume: f32,
    /// Caption template for the editing provider; no captions when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_style: Option<String>,
    /// Target languages for captions and transcripts
    #[serde(default)]
    pub languages: Vec<String>,
    /// Avatar used by the avatar video provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<String>,
    /// Primary narration voice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    /// Second speaker voice for podcasts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_voice_id: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            script_approval: false,
            start_bumper_id: None,
            end_bumper_id: None,
            background_music_id: None,
            music_volume: default_music_volume(),
            caption_style: None,
            languages: Vec::new(),
            avatar_id: None,
            voice_id: None,
            secondary_voice_id: None,
        }
    }
}

impl GenerationConfig {
    /// True when any bumper or background music is configured.
    pub fn needs_post_processing(&self) -> bool {
        self.start_bumper_id.is_some()
            || self.end_bumper_id.is_some()
            || self.background_music_id.is_some()
    }

    /// True when the video must go through the caption editing provider.
    pub fn needs_caption_editing(&self) -> bool {
        self.caption_style
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }

    /// Builder: require script approval.
    pub fn with_script_approval(mut self, enabled: bool) -> Self {
        self.script_approval = enabled;
        self
    }

    /// Builder: set background music.
    pub fn with_music(mut self, music_id: impl Into<AssetId>) -> Self {
        self.background_music_id = Some(music_id.into());
        self
    }

    /// Builder: set both bumpers.
    pub fn with_bumpers(mut self, start: Option<AssetId>, end: Option<AssetId>) -> Self {
        self.start_bumper_id = start;
        self.end_bumper_id = end;
        self
    }

    /// Builder: set caption style.
    pub fn with_captions(mut self, style: impl Into<String>) -> Self {
        self.caption_style = Some(style.into());
        self
    }
}
