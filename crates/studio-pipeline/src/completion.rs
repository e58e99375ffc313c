//! Finalizing a rendered video into an artifact.

use std::sync::Arc;

use studio_models::{Artifact, OutputEvent, ProviderHandle};
use studio_providers::{ImageRequest, Transcript, TranscriptionRequest};
use studio_storage::{object_key, MediaCategory};
use tracing::{info, warn};

use crate::context::PipelineContext;
use crate::entity::Entity;
use crate::error::{PipelineError, PipelineResult};
use crate::lifecycle::{ApplyOutcome, OutputService};
use crate::reconciler::Reconciler;

/// Turns the last render of a video into its COMPLETED artifact.
///
/// Transcription and thumbnail generation are best-effort: a video
/// completes without them rather than failing at the last step.
#[derive(Clone)]
pub struct CompletionService {
    ctx: Arc<PipelineContext>,
    reconciler: Reconciler,
    outputs: OutputService,
}

impl CompletionService {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self {
            reconciler: Reconciler::new(ctx.clone()),
            outputs: OutputService::new(ctx.clone()),
            ctx,
        }
    }

    /// Find the row currently holding `provider_video_id` in either handle
    /// slot. Caption projects win over avatar videos.
    pub async fn resolve(&self, provider_video_id: &str) -> PipelineResult<Entity> {
        let candidates = [
            ProviderHandle::CaptionProject(provider_video_id.to_string()),
            ProviderHandle::AvatarVideo(provider_video_id.to_string()),
        ];
        for handle in &candidates {
            if let Some(entity) = self.reconciler.resolve(handle).await? {
                return Ok(entity);
            }
        }
        Err(PipelineError::data_integrity(format!(
            "no video holds provider id {}",
            provider_video_id
        )))
    }

    /// Complete the row holding `provider_video_id` with `video_url`.
    ///
    /// `Ok(None)` when the row already finished.
    pub async fn complete(
        &self,
        provider_video_id: &str,
        video_url: &str,
    ) -> PipelineResult<Option<ApplyOutcome>> {
        let entity = self.resolve(provider_video_id).await?;
        let target = entity.entity_ref();
        if entity.state().status.is_terminal() {
            info!(entity = %target, provider_video_id, "Video already finished, skipping completion");
            return Ok(None);
        }

        let transcript = self.transcribe(&entity, video_url).await;
        let thumbnail_url = self.thumbnail(&entity).await;

        let (duration, text) = match transcript {
            Some(t) => (t.duration_secs, Some(t.text)),
            None => (None, None),
        };
        let mut artifact = Artifact::media(video_url)
            .with_duration(duration)
            .with_transcript(text);
        artifact.thumbnail_url = thumbnail_url;

        let outcome = self
            .outputs
            .apply(&target, OutputEvent::Complete { artifact })
            .await?;
        if outcome.is_applied() {
            info!(entity = %target, "Video completed: {}", video_url);
        }
        Ok(Some(outcome))
    }

    async fn transcribe(&self, entity: &Entity, video_url: &str) -> Option<Transcript> {
        let request = TranscriptionRequest {
            media_url: video_url.to_string(),
            language: entity.config().languages.first().cloned(),
        };
        let result = match self.ctx.providers.transcriber.transcribe(&request).await {
            Ok(response) => response.into_sync("transcriber"),
            Err(err) => Err(err),
        };
        match result {
            Ok(transcript) => Some(transcript),
            Err(err) => {
                warn!(entity = %entity.entity_ref(), "Transcription skipped: {}", err);
                None
            }
        }
    }

    async fn thumbnail(&self, entity: &Entity) -> Option<String> {
        match self.try_thumbnail(entity).await {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(entity = %entity.entity_ref(), "Thumbnail skipped: {}", err);
                None
            }
        }
    }

    async fn try_thumbnail(&self, entity: &Entity) -> PipelineResult<String> {
        let prompt = format!(
            "Cover image for a short video titled \"{}\". No text, clean composition.",
            entity.title()
        );
        let image = self
            .ctx
            .providers
            .images
            .generate_image(&ImageRequest::landscape(prompt))
            .await?
            .into_sync("image")?;

        let ext = if image.content_type.contains("png") { "png" } else { "jpg" };
        let category = match entity {
            Entity::Output(_) => MediaCategory::Video,
            Entity::Standalone(_) => MediaCategory::Standalone,
        };
        let key = object_key(
            entity.organization_id(),
            category,
            entity.entity_ref().id(),
            &format!("thumbnail-c{}.{}", entity.state().cycle, ext),
        )?;
        Ok(self
            .ctx
            .storage
            .upload_bytes(image.bytes, &key, &image.content_type)
            .await?)
    }
}
