//! One handler per queue job type.
//!
//! Handlers re-read the row they act on and skip quietly when it has
//! moved on (finished, regenerated, or already past this stage), so a
//! redelivered or stale job never pushes a row backwards.

mod audio;
mod finishing;
mod quiz;
mod script;
mod video;

use std::sync::Arc;

use studio_models::{Article, Artifact, EntityRef, OutputEvent, OutputStatus};
use studio_pipeline::{
    CompletionService, Entity, OutputService, PipelineContext, PostProcessor,
};
use studio_providers::{SpeechRequest, SynthesizedAudio, TextRequest};
use studio_queue::QueueJob;
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Dispatches jobs to their handlers.
#[derive(Clone)]
pub struct JobHandlers {
    pub(crate) ctx: Arc<PipelineContext>,
    pub(crate) config: WorkerConfig,
    pub(crate) outputs: OutputService,
    pub(crate) post: PostProcessor,
    pub(crate) completion: CompletionService,
}

impl JobHandlers {
    pub fn new(ctx: Arc<PipelineContext>, config: WorkerConfig) -> Self {
        Self {
            outputs: OutputService::new(ctx.clone()),
            post: PostProcessor::new(ctx.clone()),
            completion: CompletionService::new(ctx.clone()),
            ctx,
            config,
        }
    }

    /// Run `job` to completion.
    pub async fn handle(&self, job: &QueueJob) -> WorkerResult<()> {
        match job {
            QueueJob::GenerateScript(j) => script::generate_script(self, j).await,
            QueueJob::GenerateVideo(j) => {
                video::generate_avatar_video(self, &EntityRef::Output(j.output_id.clone())).await
            }
            QueueJob::GenerateStandaloneVideo(j) => {
                video::generate_avatar_video(
                    self,
                    &EntityRef::Standalone(j.standalone_video_id.clone()),
                )
                .await
            }
            QueueJob::GeneratePodcast(j) => audio::generate_podcast(self, j).await,
            QueueJob::GenerateAudio(j) => audio::generate_narration(self, j).await,
            QueueJob::GenerateInteractivePodcast(j) => {
                audio::generate_interactive_podcast(self, j).await
            }
            QueueJob::GenerateQuiz(j) => quiz::generate_quiz(self, j).await,
            QueueJob::SubmitCaptionEditing(j) => video::submit_caption_editing(self, j).await,
            QueueJob::PostProcessVideoOutput(_) | QueueJob::PostProcessStandaloneVideo(_) => {
                finishing::post_process(self, job).await
            }
            QueueJob::ProcessVideoCompletion(j) => finishing::complete_video(self, j).await,
            QueueJob::GenerateArticleThumbnail(j) => {
                finishing::generate_article_thumbnail(self, j).await
            }
        }
    }

    /// Load `target` if it is still PROCESSING.
    pub(crate) async fn load_processing(&self, target: &EntityRef) -> WorkerResult<Option<Entity>> {
        let entity = Entity::load(self.ctx.store.as_ref(), target).await?;
        let status = entity.state().status;
        if status == OutputStatus::Processing {
            return Ok(Some(entity));
        }
        if status.is_terminal() {
            info!(entity = %target, status = %status, "Row already finished, skipping job");
        } else {
            warn!(entity = %target, status = %status, "Row is not processing, dropping stale job");
        }
        Ok(None)
    }

    /// Article an output was generated from.
    pub(crate) async fn source_article(&self, entity: &Entity) -> WorkerResult<Article> {
        let submission_id = entity
            .submission_id()
            .ok_or_else(|| WorkerError::job_failed(format!("{} has no source article", entity.entity_ref())))?;
        let submission = self
            .ctx
            .store
            .submission(submission_id)
            .await?
            .ok_or_else(|| WorkerError::job_failed(format!("Submission {} not found", submission_id)))?;
        self.ctx
            .store
            .article(&submission.article_id)
            .await?
            .ok_or_else(|| {
                WorkerError::job_failed(format!("Article {} not found", submission.article_id))
            })
    }

    pub(crate) async fn generate_text(&self, request: TextRequest) -> WorkerResult<String> {
        let text = self
            .ctx
            .providers
            .text
            .complete(&request)
            .await?
            .into_sync("text-generator")?;
        if text.trim().is_empty() {
            return Err(WorkerError::invalid_output("empty completion"));
        }
        Ok(text)
    }

    pub(crate) async fn synthesize(&self, text: &str, voice_id: &str) -> WorkerResult<SynthesizedAudio> {
        let request = SpeechRequest {
            text: text.to_string(),
            voice_id: voice_id.to_string(),
        };
        Ok(self
            .ctx
            .providers
            .speech
            .synthesize(&request)
            .await?
            .into_sync("speech")?)
    }

    /// Move `target` to COMPLETED with `artifact`.
    pub(crate) async fn finish(&self, target: &EntityRef, artifact: Artifact) -> WorkerResult<()> {
        let outcome = self
            .outputs
            .apply(target, OutputEvent::Complete { artifact })
            .await?;
        if outcome.is_applied() {
            info!(entity = %target, "Output completed");
        }
        Ok(())
    }
}
