//! Explicit collaborator wiring.

use std::sync::Arc;

use studio_media::Compositor;
use studio_providers::{
    AvatarVideoGenerator, CaptionEditor, ImageGenerator, SpeechSynthesizer, TextGenerator,
    Transcriber,
};
use studio_queue::JobQueue;
use studio_storage::ObjectStore;
use studio_store::Store;

/// Provider adapters, one per external capability.
#[derive(Clone)]
pub struct Providers {
    pub text: Arc<dyn TextGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub avatar: Arc<dyn AvatarVideoGenerator>,
    pub captions: Arc<dyn CaptionEditor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub images: Arc<dyn ImageGenerator>,
}

/// Tunables shared by the pipeline services.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Externally reachable base URL, used to build provider webhook URLs
    pub public_base_url: String,
    /// Conditional-write attempts before giving up on a contended row
    pub max_transition_attempts: u32,
    /// Caption language when the row does not name one
    pub default_language: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8000".to_string(),
            max_transition_attempts: 5,
            default_language: "en".to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            max_transition_attempts: std::env::var("PIPELINE_MAX_TRANSITION_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_transition_attempts),
            default_language: std::env::var("DEFAULT_CAPTION_LANGUAGE")
                .unwrap_or(defaults.default_language),
        }
    }

    /// Where the caption editing provider posts its callbacks.
    pub fn caption_webhook_url(&self) -> String {
        format!("{}/webhooks/submagic", self.public_base_url)
    }
}

/// Everything a pipeline service needs, constructed once and shared via `Arc`.
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn JobQueue>,
    pub storage: Arc<dyn ObjectStore>,
    pub compositor: Arc<dyn Compositor>,
    pub providers: Providers,
    pub settings: PipelineSettings,
}

impl PipelineContext {
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<dyn JobQueue>,
        storage: Arc<dyn ObjectStore>,
        compositor: Arc<dyn Compositor>,
        providers: Providers,
    ) -> Self {
        Self {
            store,
            queue,
            storage,
            compositor,
            providers,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_webhook_url() {
        let settings = PipelineSettings {
            public_base_url: "https://studio.example.com".into(),
            ..Default::default()
        };
        assert_eq!(
            settings.caption_webhook_url(),
            "https://studio.example.com/webhooks/submagic"
        );
    }
}
