//! Post-processing, video completion and article thumbnails.

use studio_models::{EntityRef, OutputId, StandaloneVideoId};
use studio_providers::ImageRequest;
use studio_queue::{ArticleThumbnailJob, QueueJob, VideoCompletionJob};
use studio_storage::{object_key, MediaCategory};
use tracing::{info, warn};

use super::JobHandlers;
use crate::error::{WorkerError, WorkerResult};

pub(crate) async fn post_process(h: &JobHandlers, job: &QueueJob) -> WorkerResult<()> {
    let (target, media_url) = match job {
        QueueJob::PostProcessVideoOutput(j) => (
            EntityRef::Output(OutputId::from(j.entity_id.as_str())),
            &j.edited_video_url,
        ),
        QueueJob::PostProcessStandaloneVideo(j) => (
            EntityRef::Standalone(StandaloneVideoId::from(j.entity_id.as_str())),
            &j.edited_video_url,
        ),
        other => {
            return Err(WorkerError::job_failed(format!(
                "{} is not a post-processing job",
                other.job_type()
            )))
        }
    };
    if media_url.trim().is_empty() {
        return Err(WorkerError::job_failed("Post-processing job has no video URL"));
    }
    if h.post.process(&target, media_url).await?.is_none() {
        info!(entity = %target, "Post-processing already done");
    }
    Ok(())
}

pub(crate) async fn complete_video(h: &JobHandlers, job: &VideoCompletionJob) -> WorkerResult<()> {
    if job.video_url.trim().is_empty() {
        return Err(WorkerError::job_failed("Completion job has no video URL"));
    }
    h.completion
        .complete(&job.provider_video_id, &job.video_url)
        .await?;
    Ok(())
}

/// Nothing depends on the thumbnail, so a missing article is not an error.
pub(crate) async fn generate_article_thumbnail(
    h: &JobHandlers,
    job: &ArticleThumbnailJob,
) -> WorkerResult<()> {
    let Some(article) = h.ctx.store.article(&job.article_id).await? else {
        warn!(article_id = %job.article_id, "Article gone before its thumbnail was generated");
        return Ok(());
    };
    if article.thumbnail_url.is_some() {
        info!(article_id = %job.article_id, "Article already has a thumbnail");
        return Ok(());
    }

    let prompt = format!(
        "Editorial header illustration for an article titled \"{}\". No text in the image.",
        job.title
    );
    let image = h
        .ctx
        .providers
        .images
        .generate_image(&ImageRequest::landscape(prompt))
        .await?
        .into_sync("image-generator")?;

    let file_name = if image.content_type == "image/jpeg" {
        "thumbnail.jpg"
    } else {
        "thumbnail.png"
    };
    let key = object_key(
        &job.organization_id,
        MediaCategory::Thumbnail,
        job.article_id.as_str(),
        file_name,
    )?;
    let url = h
        .ctx
        .storage
        .upload_bytes(image.bytes, &key, &image.content_type)
        .await?;
    h.ctx.store.set_article_thumbnail(&job.article_id, &url).await?;
    info!(article_id = %job.article_id, url = %url, "Article thumbnail stored");
    Ok(())
}
