//! Normalized request/response types.

use serde::{Deserialize, Serialize};
use studio_models::ProviderHandle;

use crate::error::{ProviderError, ProviderResult};

/// Outcome of a provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse<T> {
    /// Result available immediately
    Sync(T),
    /// Work accepted; completion arrives via webhook
    Async(ProviderHandle),
}

impl<T> ProviderResponse<T> {
    /// Expect a synchronous result.
    pub fn into_sync(self, provider: &'static str) -> ProviderResult<T> {
        match self {
            ProviderResponse::Sync(value) => Ok(value),
            ProviderResponse::Async(handle) => Err(ProviderError::invalid_response(
                provider,
                format!("expected a result, got handle {}", handle.id()),
            )),
        }
    }

    /// Expect an asynchronous handle.
    pub fn into_handle(self, provider: &'static str) -> ProviderResult<ProviderHandle> {
        match self {
            ProviderResponse::Async(handle) => Ok(handle),
            ProviderResponse::Sync(_) => Err(ProviderError::invalid_response(
                provider,
                "expected a handle, got an immediate result",
            )),
        }
    }
}

/// Text completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub system: String,
    pub prompt: String,
    /// Ask for a JSON object response
    #[serde(default)]
    pub json: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl TextRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            json: false,
            max_tokens: None,
        }
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
}

/// Encoded audio returned by a speech provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarVideoRequest {
    pub title: String,
    pub script: String,
    pub avatar_id: String,
    pub voice_id: String,
    /// Echoed back in the provider's callback
    pub callback_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionRequest {
    pub title: String,
    pub video_url: String,
    pub template: String,
    pub language: String,
    pub webhook_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    pub media_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: String,
}

impl ImageRequest {
    pub fn landscape(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: "1792x1024".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}
