//! Creating and reading submissions.

use std::sync::Arc;

use serde::Serialize;
use studio_models::{
    ArticleId, GenerationConfig, OrganizationId, Output, OutputEvent, RequestedOutputs,
    Submission, SubmissionId,
};
use tracing::{info, warn};

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::lifecycle::OutputService;

/// Request to turn an article into outputs.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub organization_id: OrganizationId,
    pub article_id: ArticleId,
    pub requested: RequestedOutputs,
    pub config: GenerationConfig,
    pub created_by: String,
}

/// A submission with its outputs, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub outputs: Vec<Output>,
}

#[derive(Clone)]
pub struct SubmissionService {
    ctx: Arc<PipelineContext>,
}

impl SubmissionService {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    /// Create the submission, one PENDING output per requested kind, and
    /// start each output.
    pub async fn create(&self, request: NewSubmission) -> PipelineResult<SubmissionView> {
        if request.requested.is_empty() {
            return Err(PipelineError::validation(
                "At least one output type must be requested",
            ));
        }
        if !(0.0..=1.0).contains(&request.config.music_volume) {
            return Err(PipelineError::validation(
                "music_volume must be between 0 and 1",
            ));
        }

        let store = self.ctx.store.as_ref();
        let article = store
            .article(&request.article_id)
            .await?
            .filter(|a| a.organization_id == request.organization_id)
            .ok_or_else(|| PipelineError::not_found("article", request.article_id.as_str()))?;

        let submission = store
            .create_submission(Submission::new(
                request.organization_id.clone(),
                article.id.clone(),
                request.requested.clone(),
                request.created_by.clone(),
            ))
            .await?;

        let outputs = OutputService::new(self.ctx.clone());
        for kind in request.requested.kinds() {
            let output = store
                .create_output(Output::new(
                    submission.id.clone(),
                    request.organization_id.clone(),
                    kind,
                    request.config.clone(),
                ))
                .await?;

            if let Err(err) = outputs.apply(&output.entity_ref(), OutputEvent::Start).await {
                // Keep going: the other outputs are independent and the
                // failed one is visible in the rollup.
                warn!(
                    submission_id = %submission.id,
                    output_id = %output.id,
                    "Failed to start {} output: {}",
                    kind,
                    err
                );
                outputs.fail(&output.entity_ref(), err.user_message()).await?;
            }
        }

        info!(
            submission_id = %submission.id,
            organization_id = %request.organization_id,
            "Created submission for {:?}",
            request.requested.kinds()
        );

        self.get(&request.organization_id, &submission.id).await
    }

    /// Submission with its outputs, scoped to `organization_id`.
    pub async fn get(
        &self,
        organization_id: &OrganizationId,
        id: &SubmissionId,
    ) -> PipelineResult<SubmissionView> {
        let store = self.ctx.store.as_ref();
        let submission = store
            .submission(id)
            .await?
            .filter(|s| &s.organization_id == organization_id)
            .ok_or_else(|| PipelineError::not_found("submission", id.as_str()))?;
        let outputs = store.outputs_for_submission(id).await?;
        Ok(SubmissionView {
            submission,
            outputs,
        })
    }
}
