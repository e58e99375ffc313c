//! Avatar rendering and caption editing submissions.
//!
//! Both stages hand work to an asynchronous provider and record the
//! returned handle; the row then waits for the provider's webhook.

use studio_models::{EntityRef, OutputEvent, ProviderHandle};
use studio_providers::{AvatarVideoRequest, CaptionRequest};
use studio_queue::CaptionEditingJob;
use tracing::info;

use super::JobHandlers;
use crate::error::{WorkerError, WorkerResult};

pub(crate) async fn generate_avatar_video(h: &JobHandlers, target: &EntityRef) -> WorkerResult<()> {
    let Some(entity) = h.load_processing(target).await? else {
        return Ok(());
    };
    let state = entity.state();
    if let Some(existing) = &state.handles.avatar_video_id {
        info!(entity = %target, avatar_video_id = %existing, "Avatar video already submitted");
        return Ok(());
    }
    let script = state
        .script
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| WorkerError::job_failed("Video has no script to render"))?;

    let config = entity.config();
    let request = AvatarVideoRequest {
        title: entity.title(),
        script,
        avatar_id: config.avatar_id.clone().unwrap_or_default(),
        voice_id: config.voice_id.clone().unwrap_or_default(),
        callback_id: target.to_string(),
    };
    let handle = h
        .ctx
        .providers
        .avatar
        .submit(&request)
        .await?
        .into_handle("avatar-video")?;
    let handle = match handle {
        ProviderHandle::AvatarVideo(id) => ProviderHandle::AvatarVideo(id),
        ProviderHandle::CaptionProject(id) => {
            return Err(WorkerError::invalid_output(format!(
                "avatar provider returned caption project {}",
                id
            )))
        }
    };

    info!(entity = %target, avatar_video_id = handle.id(), "Avatar video submitted");
    h.outputs
        .apply(target, OutputEvent::ProviderAccepted { handle })
        .await?;
    Ok(())
}

pub(crate) async fn submit_caption_editing(
    h: &JobHandlers,
    job: &CaptionEditingJob,
) -> WorkerResult<()> {
    let Some(entity) = h.load_processing(&job.entity).await? else {
        return Ok(());
    };
    if let Some(existing) = &entity.state().handles.caption_project_id {
        info!(entity = %job.entity, project_id = %existing, "Caption project already submitted");
        return Ok(());
    }

    let config = entity.config();
    let template = config
        .caption_style
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| WorkerError::job_failed("No caption style configured"))?;
    let language = config
        .languages
        .first()
        .cloned()
        .unwrap_or_else(|| h.ctx.settings.default_language.clone());

    let request = CaptionRequest {
        title: entity.title(),
        video_url: job.video_url.clone(),
        template,
        language,
        webhook_url: h.ctx.settings.caption_webhook_url(),
    };
    let handle = h
        .ctx
        .providers
        .captions
        .submit(&request)
        .await?
        .into_handle("caption-editor")?;
    let handle = ProviderHandle::CaptionProject(handle.id().to_string());

    info!(entity = %job.entity, project_id = handle.id(), "Caption project submitted");
    h.outputs
        .apply(&job.entity, OutputEvent::ProviderAccepted { handle })
        .await?;
    Ok(())
}
