//! OpenAI: chat completions, audio transcription and image generation.

use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{AuthScheme, HttpProvider, ProviderConfig};
use crate::traits::{ImageGenerator, TextGenerator, Transcriber};
use crate::types::{
    GeneratedImage, ImageRequest, ProviderResponse, TextRequest, Transcript, TranscriptionRequest,
};

const PROVIDER: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub provider: ProviderConfig,
    pub chat_model: String,
    pub transcription_model: String,
    pub image_model: String,
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        Self {
            provider: ProviderConfig::from_env("OPENAI", "https://api.openai.com/v1", 120),
            chat_model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            transcription_model: std::env::var("OPENAI_TRANSCRIPTION_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string()),
            image_model: std::env::var("OPENAI_IMAGE_MODEL")
                .unwrap_or_else(|_| "dall-e-3".to_string()),
        }
    }

    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            chat_model: "gpt-4o-mini".to_string(),
            transcription_model: "whisper-1".to_string(),
            image_model: "dall-e-3".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

/// OpenAI API client.
pub struct OpenAiClient {
    http: HttpProvider,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> ProviderResult<Self> {
        let http = HttpProvider::new(PROVIDER, config.provider.clone(), AuthScheme::Bearer)?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(OpenAiConfig::from_env())
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, request: &TextRequest) -> ProviderResult<ProviderResponse<String>> {
        let mut body = json!({
            "model": self.config.chat_model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });
        if request.json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let response: ChatResponse = self.http.post_json("chat/completions", &body).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "empty completion"))?;

        debug!(chars = content.len(), "Chat completion received");
        Ok(ProviderResponse::Sync(content))
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> ProviderResult<ProviderResponse<Transcript>> {
        // The API takes an upload, not a URL
        let media = self
            .http
            .client()
            .get(&request.media_url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
        if !media.status().is_success() {
            return Err(ProviderError::bad_request(
                PROVIDER,
                format!("media download returned {}", media.status()),
            ));
        }
        let bytes = self.http.bytes(media).await?;

        let mut form = Form::new()
            .text("model", self.config.transcription_model.clone())
            .text("response_format", "verbose_json")
            .part("file", Part::bytes(bytes).file_name("media.mp4"));
        if let Some(language) = &request.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .http
            .send(self.http.post("audio/transcriptions").multipart(form))
            .await?;
        let parsed: TranscriptionResponse = self.http.decode(response).await?;

        Ok(ProviderResponse::Sync(Transcript {
            text: parsed.text,
            duration_secs: parsed.duration,
        }))
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> ProviderResult<ProviderResponse<GeneratedImage>> {
        let body = json!({
            "model": self.config.image_model,
            "prompt": request.prompt,
            "size": request.size,
            "n": 1,
            "response_format": "b64_json",
        });
        let response: ImageResponse = self.http.post_json("images/generations", &body).await?;
        let encoded = response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no image returned"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ProviderError::invalid_response(PROVIDER, format!("bad base64: {}", e)))?;

        Ok(ProviderResponse::Sync(GeneratedImage {
            bytes,
            content_type: "image/png".to_string(),
        }))
    }
}
