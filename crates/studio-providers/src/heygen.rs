//! HeyGen avatar video generation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use studio_models::ProviderHandle;
use tracing::info;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{AuthScheme, HttpProvider, ProviderConfig};
use crate::traits::AvatarVideoGenerator;
use crate::types::{AvatarVideoRequest, ProviderResponse};

const PROVIDER: &str = "heygen";

#[derive(Debug, Clone)]
pub struct HeyGenConfig {
    pub provider: ProviderConfig,
    pub default_avatar_id: String,
    pub default_voice_id: String,
    pub width: u32,
    pub height: u32,
}

impl HeyGenConfig {
    pub fn from_env() -> Self {
        Self {
            provider: ProviderConfig::from_env("HEYGEN", "https://api.heygen.com", 60),
            default_avatar_id: std::env::var("HEYGEN_DEFAULT_AVATAR").unwrap_or_default(),
            default_voice_id: std::env::var("HEYGEN_DEFAULT_VOICE").unwrap_or_default(),
            width: 1080,
            height: 1920,
        }
    }

    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            default_avatar_id: String::new(),
            default_voice_id: String::new(),
            width: 1080,
            height: 1920,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    data: Option<GenerateData>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GenerateData {
    video_id: String,
}

pub struct HeyGenClient {
    http: HttpProvider,
    config: HeyGenConfig,
}

impl HeyGenClient {
    pub fn new(config: HeyGenConfig) -> ProviderResult<Self> {
        let http = HttpProvider::new(
            PROVIDER,
            config.provider.clone(),
            AuthScheme::Header("X-Api-Key"),
        )?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(HeyGenConfig::from_env())
    }

    fn pick<'a>(requested: &'a str, fallback: &'a str) -> &'a str {
        if requested.is_empty() {
            fallback
        } else {
            requested
        }
    }
}

#[async_trait]
impl AvatarVideoGenerator for HeyGenClient {
    async fn submit(&self, request: &AvatarVideoRequest) -> ProviderResult<ProviderResponse<()>> {
        let avatar_id = Self::pick(&request.avatar_id, &self.config.default_avatar_id);
        let voice_id = Self::pick(&request.voice_id, &self.config.default_voice_id);
        if avatar_id.is_empty() || voice_id.is_empty() {
            return Err(ProviderError::bad_request(
                PROVIDER,
                "avatar and voice must be configured",
            ));
        }

        let body = json!({
            "title": request.title,
            "callback_id": request.callback_id,
            "video_inputs": [{
                "character": { "type": "avatar", "avatar_id": avatar_id, "avatar_style": "normal" },
                "voice": { "type": "text", "input_text": request.script, "voice_id": voice_id },
            }],
            "dimension": { "width": self.config.width, "height": self.config.height },
        });

        let response: GenerateResponse = self.http.post_json("v2/video/generate", &body).await?;
        let video_id = match (response.data, response.error) {
            (Some(data), None) if !data.video_id.is_empty() => data.video_id,
            (_, Some(error)) if !error.is_null() => {
                return Err(ProviderError::bad_request(PROVIDER, error.to_string()))
            }
            _ => return Err(ProviderError::invalid_response(PROVIDER, "missing video_id")),
        };

        info!(video_id = %video_id, "Avatar video accepted");
        Ok(ProviderResponse::Async(ProviderHandle::AvatarVideo(video_id)))
    }
}
