//! ElevenLabs text to speech.

use async_trait::async_trait;
use serde_json::json;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{AuthScheme, HttpProvider, ProviderConfig};
use crate::traits::SpeechSynthesizer;
use crate::types::{ProviderResponse, SpeechRequest, SynthesizedAudio};

const PROVIDER: &str = "elevenlabs";

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub provider: ProviderConfig,
    pub model_id: String,
}

impl ElevenLabsConfig {
    pub fn from_env() -> Self {
        Self {
            provider: ProviderConfig::from_env("ELEVENLABS", "https://api.elevenlabs.io", 120),
            model_id: std::env::var("ELEVENLABS_MODEL")
                .unwrap_or_else(|_| "eleven_multilingual_v2".to_string()),
        }
    }

    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            model_id: "eleven_multilingual_v2".to_string(),
        }
    }
}

pub struct ElevenLabsClient {
    http: HttpProvider,
    config: ElevenLabsConfig,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsConfig) -> ProviderResult<Self> {
        let http = HttpProvider::new(
            PROVIDER,
            config.provider.clone(),
            AuthScheme::Header("xi-api-key"),
        )?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ElevenLabsConfig::from_env())
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> ProviderResult<ProviderResponse<SynthesizedAudio>> {
        if request.text.trim().is_empty() {
            return Err(ProviderError::bad_request(PROVIDER, "text must not be empty"));
        }

        let body = json!({
            "text": request.text,
            "model_id": self.config.model_id,
        });
        let response = self
            .http
            .send(
                self.http
                    .post(&format!("v1/text-to-speech/{}", request.voice_id))
                    .header("accept", "audio/mpeg")
                    .json(&body),
            )
            .await?;
        let bytes = self.http.bytes(response).await?;
        if bytes.is_empty() {
            return Err(ProviderError::invalid_response(PROVIDER, "empty audio"));
        }

        Ok(ProviderResponse::Sync(SynthesizedAudio {
            bytes,
            content_type: "audio/mpeg".to_string(),
        }))
    }
}
