//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studio_models::{
    ArticleId, EntityRef, JobId, OrganizationId, OutputId, OutputKind, StandaloneVideoId,
};

/// Job targeting one submission output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputJob {
    pub output_id: OutputId,
    pub organization_id: OrganizationId,
}

impl OutputJob {
    pub fn new(output_id: OutputId, organization_id: OrganizationId) -> Self {
        Self {
            output_id,
            organization_id,
        }
    }
}

/// Job targeting either an output or a standalone video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityJob {
    pub entity: EntityRef,
    pub organization_id: OrganizationId,
}

/// `generate-standalone-video` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneVideoJob {
    pub standalone_video_id: StandaloneVideoId,
    pub organization_id: OrganizationId,
}

/// Submit a rendered avatar video to the caption editing provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionEditingJob {
    pub entity: EntityRef,
    pub organization_id: OrganizationId,
    pub video_url: String,
}

/// `post-process-video-output` / `post-process-standalone-video` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostProcessJob {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    pub edited_video_url: String,
}

/// `process-video-completion` payload.
///
/// Carries only the provider id; the handler resolves the owning row
/// from persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCompletionJob {
    pub provider_video_id: String,
    pub video_url: String,
}

/// `generate-article-thumbnail` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleThumbnailJob {
    pub article_id: ArticleId,
    pub title: String,
    pub organization_id: OrganizationId,
}

/// Every job the pipeline knows how to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum QueueJob {
    GenerateScript(EntityJob),
    GenerateVideo(OutputJob),
    GeneratePodcast(OutputJob),
    GenerateAudio(OutputJob),
    GenerateQuiz(OutputJob),
    GenerateInteractivePodcast(OutputJob),
    GenerateStandaloneVideo(StandaloneVideoJob),
    SubmitCaptionEditing(CaptionEditingJob),
    PostProcessVideoOutput(PostProcessJob),
    PostProcessStandaloneVideo(PostProcessJob),
    ProcessVideoCompletion(VideoCompletionJob),
    GenerateArticleThumbnail(ArticleThumbnailJob),
}

/// What to fail when a job can no longer succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureTarget {
    Entity(EntityRef),
    /// Row must be resolved through its provider handle first
    ProviderHandle(String),
    /// Best-effort job; nothing to fail
    None,
}

impl QueueJob {
    /// Media generation job for an output of `kind`.
    pub fn generate_output(kind: OutputKind, job: OutputJob) -> Self {
        match kind {
            OutputKind::Audio => QueueJob::GenerateAudio(job),
            OutputKind::Video => QueueJob::GenerateVideo(job),
            OutputKind::Podcast => QueueJob::GeneratePodcast(job),
            OutputKind::Quiz => QueueJob::GenerateQuiz(job),
            OutputKind::InteractivePodcast => QueueJob::GenerateInteractivePodcast(job),
        }
    }

    /// Wire name of the job type.
    pub fn job_type(&self) -> &'static str {
        match self {
            QueueJob::GenerateScript(_) => "generate-script",
            QueueJob::GenerateVideo(_) => "generate-video",
            QueueJob::GeneratePodcast(_) => "generate-podcast",
            QueueJob::GenerateAudio(_) => "generate-audio",
            QueueJob::GenerateQuiz(_) => "generate-quiz",
            QueueJob::GenerateInteractivePodcast(_) => "generate-interactive-podcast",
            QueueJob::GenerateStandaloneVideo(_) => "generate-standalone-video",
            QueueJob::SubmitCaptionEditing(_) => "submit-caption-editing",
            QueueJob::PostProcessVideoOutput(_) => "post-process-video-output",
            QueueJob::PostProcessStandaloneVideo(_) => "post-process-standalone-video",
            QueueJob::ProcessVideoCompletion(_) => "process-video-completion",
            QueueJob::GenerateArticleThumbnail(_) => "generate-article-thumbnail",
        }
    }

    /// Key under which at most one copy of this job may be queued.
    pub fn idempotency_key(&self) -> String {
        let subject = match self {
            QueueJob::GenerateScript(j) => j.entity.to_string(),
            QueueJob::GenerateVideo(j)
            | QueueJob::GeneratePodcast(j)
            | QueueJob::GenerateAudio(j)
            | QueueJob::GenerateQuiz(j)
            | QueueJob::GenerateInteractivePodcast(j) => j.output_id.to_string(),
            QueueJob::GenerateStandaloneVideo(j) => j.standalone_video_id.to_string(),
            QueueJob::SubmitCaptionEditing(j) => j.entity.to_string(),
            QueueJob::PostProcessVideoOutput(j) | QueueJob::PostProcessStandaloneVideo(j) => {
                j.entity_id.clone()
            }
            QueueJob::ProcessVideoCompletion(j) => j.provider_video_id.clone(),
            QueueJob::GenerateArticleThumbnail(j) => j.article_id.to_string(),
        };
        format!("{}:{}", self.job_type(), subject)
    }

    pub fn organization_id(&self) -> Option<&OrganizationId> {
        match self {
            QueueJob::GenerateScript(j) => Some(&j.organization_id),
            QueueJob::GenerateVideo(j)
            | QueueJob::GeneratePodcast(j)
            | QueueJob::GenerateAudio(j)
            | QueueJob::GenerateQuiz(j)
            | QueueJob::GenerateInteractivePodcast(j) => Some(&j.organization_id),
            QueueJob::GenerateStandaloneVideo(j) => Some(&j.organization_id),
            QueueJob::SubmitCaptionEditing(j) => Some(&j.organization_id),
            QueueJob::PostProcessVideoOutput(j) | QueueJob::PostProcessStandaloneVideo(j) => {
                j.organization_id.as_ref()
            }
            QueueJob::ProcessVideoCompletion(_) => None,
            QueueJob::GenerateArticleThumbnail(j) => Some(&j.organization_id),
        }
    }

    /// Row to fail once retries are exhausted or the error is permanent.
    pub fn failure_target(&self) -> FailureTarget {
        match self {
            QueueJob::GenerateScript(j) => FailureTarget::Entity(j.entity.clone()),
            QueueJob::GenerateVideo(j)
            | QueueJob::GeneratePodcast(j)
            | QueueJob::GenerateAudio(j)
            | QueueJob::GenerateQuiz(j)
            | QueueJob::GenerateInteractivePodcast(j) => {
                FailureTarget::Entity(EntityRef::Output(j.output_id.clone()))
            }
            QueueJob::GenerateStandaloneVideo(j) => {
                FailureTarget::Entity(EntityRef::Standalone(j.standalone_video_id.clone()))
            }
            QueueJob::SubmitCaptionEditing(j) => FailureTarget::Entity(j.entity.clone()),
            QueueJob::PostProcessVideoOutput(j) => {
                FailureTarget::Entity(EntityRef::Output(OutputId::from(j.entity_id.as_str())))
            }
            QueueJob::PostProcessStandaloneVideo(j) => FailureTarget::Entity(
                EntityRef::Standalone(StandaloneVideoId::from(j.entity_id.as_str())),
            ),
            QueueJob::ProcessVideoCompletion(j) => {
                FailureTarget::ProviderHandle(j.provider_video_id.clone())
            }
            QueueJob::GenerateArticleThumbnail(_) => FailureTarget::None,
        }
    }
}

/// Message stored in the stream: the job plus delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: JobId,
    /// Failed attempts so far
    #[serde(default)]
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
    pub job: QueueJob,
}

impl JobEnvelope {
    pub fn new(job: QueueJob) -> Self {
        Self {
            job_id: JobId::new(),
            attempt: 0,
            enqueued_at: Utc::now(),
            job,
        }
    }

    /// Copy scheduled for the next attempt.
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}
