//! Creating and reading standalone videos.

use std::sync::Arc;

use studio_models::{
    GenerationConfig, OrganizationId, OutputEvent, StandaloneVideo, StandaloneVideoId,
};
use tracing::info;

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::lifecycle::OutputService;

/// Request for a video without a source article.
#[derive(Debug, Clone)]
pub struct NewStandaloneVideo {
    pub organization_id: OrganizationId,
    pub title: String,
    /// Brief the script writer works from
    pub prompt: Option<String>,
    /// Finished script; skips script generation
    pub script: Option<String>,
    pub config: GenerationConfig,
    pub created_by: String,
}

#[derive(Clone)]
pub struct StandaloneService {
    ctx: Arc<PipelineContext>,
}

impl StandaloneService {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, request: NewStandaloneVideo) -> PipelineResult<StandaloneVideo> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(PipelineError::validation("title must not be empty"));
        }
        let prompt = request.prompt.filter(|p| !p.trim().is_empty());
        let script = request.script.filter(|s| !s.trim().is_empty());
        if prompt.is_none() && script.is_none() {
            return Err(PipelineError::validation(
                "Either a prompt or a script is required",
            ));
        }

        let mut video = StandaloneVideo::new(
            request.organization_id.clone(),
            title,
            request.created_by,
            request.config,
        );
        if let Some(prompt) = prompt {
            video = video.with_prompt(prompt);
        }
        if let Some(script) = script {
            video = video.with_script(script);
        }

        let video = self.ctx.store.create_standalone(video).await?;
        info!(
            standalone_video_id = %video.id,
            organization_id = %video.organization_id,
            "Created standalone video"
        );

        OutputService::new(self.ctx.clone())
            .apply(&video.entity_ref(), OutputEvent::Start)
            .await?;
        self.get(&request.organization_id, &video.id).await
    }

    /// Standalone video scoped to `organization_id`.
    pub async fn get(
        &self,
        organization_id: &OrganizationId,
        id: &StandaloneVideoId,
    ) -> PipelineResult<StandaloneVideo> {
        self.ctx
            .store
            .standalone(id)
            .await?
            .filter(|v| &v.organization_id == organization_id)
            .ok_or_else(|| PipelineError::not_found("standalone_video", id.as_str()))
    }
}
