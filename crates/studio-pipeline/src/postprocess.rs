//! Post-processing: bumpers and background music around a finished render.

use std::sync::Arc;

use studio_media::{BumperSource, CompositeSpec, MusicSource};
use studio_models::{AssetId, EntityRef, MediaStage, OrganizationId, OutputEvent};
use studio_storage::{object_key, MediaCategory};
use tracing::{error, info};

use crate::context::PipelineContext;
use crate::entity::Entity;
use crate::error::{PipelineError, PipelineResult};
use crate::lifecycle::{ApplyOutcome, OutputService};

/// Composites the configured assets onto an edited video and hands the
/// result back to the lifecycle.
#[derive(Clone)]
pub struct PostProcessor {
    ctx: Arc<PipelineContext>,
    outputs: OutputService,
}

impl PostProcessor {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self {
            outputs: OutputService::new(ctx.clone()),
            ctx,
        }
    }

    /// Render `media_url` with the row's bumpers and music.
    ///
    /// Returns `Ok(None)` when the row already finished or already has a
    /// composite. Permanent errors fail the row before being returned;
    /// retryable ones are left to the job's retry policy.
    pub async fn process(
        &self,
        target: &EntityRef,
        media_url: &str,
    ) -> PipelineResult<Option<ApplyOutcome>> {
        let entity = Entity::load(self.ctx.store.as_ref(), target).await?;
        let state = entity.state();
        if state.status.is_terminal() || state.composite_url.is_some() {
            info!(entity = %target, status = %state.status, "Post-processing already done, skipping");
            return Ok(None);
        }

        match self.render(&entity, media_url).await {
            Ok(url) => {
                let outcome = self
                    .outputs
                    .apply(
                        target,
                        OutputEvent::MediaReady {
                            stage: MediaStage::Composited,
                            url,
                        },
                    )
                    .await?;
                Ok(Some(outcome))
            }
            Err(err) if !err.is_retryable() => {
                error!(entity = %target, "Post-processing failed permanently: {}", err);
                self.outputs.fail(target, err.user_message()).await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn render(&self, entity: &Entity, media_url: &str) -> PipelineResult<String> {
        let org = entity.organization_id();
        let config = entity.config();

        let mut spec = CompositeSpec::new(media_url);
        if let Some(id) = &config.start_bumper_id {
            spec.start = Some(self.bumper(org, id).await?);
        }
        if let Some(id) = &config.end_bumper_id {
            spec.end = Some(self.bumper(org, id).await?);
        }
        if let Some(id) = &config.background_music_id {
            spec.music = Some(self.music(org, id, config.music_volume).await?);
        }

        let rendered = self.ctx.compositor.composite(&spec).await?;

        let category = match entity {
            Entity::Output(_) => MediaCategory::Video,
            Entity::Standalone(_) => MediaCategory::Standalone,
        };
        let target = entity.entity_ref();
        let key = object_key(
            org,
            category,
            target.id(),
            &format!("composite-c{}.mp4", entity.state().cycle),
        )?;
        let url = self
            .ctx
            .storage
            .upload_file(rendered.path(), &key, "video/mp4")
            .await?;

        metrics::counter!("studio_post_processed_total", "table" => target.table()).increment(1);
        info!(entity = %target, "Uploaded composite to {}", url);
        Ok(url)
    }

    async fn bumper(&self, org: &OrganizationId, id: &AssetId) -> PipelineResult<BumperSource> {
        match self.ctx.store.bumper(id).await? {
            Some(b) if &b.organization_id == org => Ok(BumperSource {
                media_url: b.media_url,
                media: b.media,
            }),
            _ => Err(PipelineError::validation(format!("Bumper {} not found", id))),
        }
    }

    async fn music(
        &self,
        org: &OrganizationId,
        id: &AssetId,
        volume: f32,
    ) -> PipelineResult<MusicSource> {
        match self.ctx.store.music(id).await? {
            Some(m) if &m.organization_id == org => Ok(MusicSource {
                media_url: m.media_url,
                volume: volume.clamp(0.0, 1.0),
            }),
            _ => Err(PipelineError::validation(format!(
                "Background music {} not found",
                id
            ))),
        }
    }
}
