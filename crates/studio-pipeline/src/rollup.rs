//! Persisting submission rollups.

use std::sync::Arc;

use chrono::Utc;
use studio_models::{compute_rollup, SubmissionId, SubmissionStatus};
use studio_store::StoreError;
use tracing::{debug, info};

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};

/// Recomputes and stores a submission's status from its outputs.
#[derive(Clone)]
pub struct RollupService {
    ctx: Arc<PipelineContext>,
}

impl RollupService {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    /// Recompute the rollup and write it back.
    ///
    /// The write happens even when the status is unchanged: bumping the
    /// version makes a concurrent recompute that read older children fail
    /// its write and read again, instead of storing a stale status.
    pub async fn recompute(&self, submission_id: &SubmissionId) -> PipelineResult<SubmissionStatus> {
        let store = self.ctx.store.as_ref();
        let attempts = self.ctx.settings.max_transition_attempts.max(1);

        for _ in 0..attempts {
            let mut submission = store
                .submission(submission_id)
                .await?
                .ok_or_else(|| PipelineError::not_found("submission", submission_id.as_str()))?;

            let children: Vec<_> = store
                .outputs_for_submission(submission_id)
                .await?
                .into_iter()
                .map(|o| (o.kind, o.state.status))
                .collect();
            let status = compute_rollup(&submission.requested, &children);

            let previous = submission.status;
            let version = submission.version;
            if status != previous {
                submission.status = status;
                submission.updated_at = Utc::now();
            }

            match store.update_submission(submission, version).await {
                Ok(_) if status == previous => {
                    debug!(submission_id = %submission_id, %status, "Rollup unchanged");
                    return Ok(status);
                }
                Ok(_) => {
                    info!(
                        submission_id = %submission_id,
                        "Submission status {} -> {}",
                        previous,
                        status
                    );
                    return Ok(status);
                }
                // Another child changed at the same time; read again.
                Err(StoreError::Conflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(PipelineError::Contended(format!("submission:{}", submission_id)))
    }
}
