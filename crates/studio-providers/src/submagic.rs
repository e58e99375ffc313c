//! Submagic caption and B-roll editing.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use studio_models::ProviderHandle;
use tracing::info;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{AuthScheme, HttpProvider, ProviderConfig};
use crate::traits::CaptionEditor;
use crate::types::{CaptionRequest, ProviderResponse};

const PROVIDER: &str = "submagic";

#[derive(Debug, Clone)]
pub struct SubmagicConfig {
    pub provider: ProviderConfig,
    pub magic_brolls: bool,
    pub magic_zooms: bool,
}

impl SubmagicConfig {
    pub fn from_env() -> Self {
        Self {
            provider: ProviderConfig::from_env("SUBMAGIC", "https://api.submagic.co", 60),
            magic_brolls: std::env::var("SUBMAGIC_MAGIC_BROLLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            magic_zooms: std::env::var("SUBMAGIC_MAGIC_ZOOMS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            magic_brolls: false,
            magic_zooms: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
}

pub struct SubmagicClient {
    http: HttpProvider,
    config: SubmagicConfig,
}

impl SubmagicClient {
    pub fn new(config: SubmagicConfig) -> ProviderResult<Self> {
        let http = HttpProvider::new(
            PROVIDER,
            config.provider.clone(),
            AuthScheme::Header("x-api-key"),
        )?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(SubmagicConfig::from_env())
    }
}

#[async_trait]
impl CaptionEditor for SubmagicClient {
    async fn submit(&self, request: &CaptionRequest) -> ProviderResult<ProviderResponse<()>> {
        let body = json!({
            "title": request.title,
            "language": request.language,
            "videoUrl": request.video_url,
            "templateName": request.template,
            "webhookUrl": request.webhook_url,
            "magicBrolls": self.config.magic_brolls,
            "magicZooms": self.config.magic_zooms,
        });

        let response: ProjectResponse = self.http.post_json("v1/projects", &body).await?;
        let project_id = response
            .id
            .or(response.project_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "missing project id"))?;

        info!(project_id = %project_id, "Caption project created");
        Ok(ProviderResponse::Async(ProviderHandle::CaptionProject(
            project_id,
        )))
    }
}
