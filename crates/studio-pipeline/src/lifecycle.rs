//! Applying lifecycle events to persisted rows.
//!
//! Every change goes through the same steps: load the row, plan the
//! transition with [`studio_models::plan`], write it back with a
//! conditional update, and only after the write succeeds run the effects
//! the plan asked for. A lost race re-reads and re-plans, so a duplicate
//! webhook or a retried job can never overwrite a newer state.

use std::sync::Arc;

use chrono::Utc;
use studio_models::{plan, Effect, EntityRef, OutputEvent, OutputStatus, TransitionError};
use studio_queue::{
    CaptionEditingJob, EntityJob, OutputJob, PostProcessJob, QueueJob, StandaloneVideoJob,
    VideoCompletionJob,
};
use studio_store::StoreError;
use tracing::{debug, error, info, warn};

use crate::context::PipelineContext;
use crate::entity::Entity;
use crate::error::{PipelineError, PipelineResult};
use crate::rollup::RollupService;

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The row moved; `entity` is the stored result.
    Applied {
        entity: Entity,
        from: OutputStatus,
        to: OutputStatus,
    },
    /// Redelivery or event against a finished row; nothing was written.
    Ignored {
        entity: Entity,
        reason: TransitionError,
    },
}

impl ApplyOutcome {
    pub fn entity(&self) -> &Entity {
        match self {
            ApplyOutcome::Applied { entity, .. } | ApplyOutcome::Ignored { entity, .. } => entity,
        }
    }

    pub fn into_entity(self) -> Entity {
        match self {
            ApplyOutcome::Applied { entity, .. } | ApplyOutcome::Ignored { entity, .. } => entity,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

/// Drives outputs and standalone videos through their lifecycle.
#[derive(Clone)]
pub struct OutputService {
    ctx: Arc<PipelineContext>,
}

impl OutputService {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    /// Apply `event` to `target` and run the resulting effects.
    ///
    /// Domain rejections come back as
    /// [`PipelineError::InvalidStateTransition`]; redeliveries and events
    /// against finished rows come back as [`ApplyOutcome::Ignored`].
    pub async fn apply(
        &self,
        target: &EntityRef,
        event: OutputEvent,
    ) -> PipelineResult<ApplyOutcome> {
        let (outcome, effects) = self.transition(target, &event).await?;

        if let ApplyOutcome::Ignored { entity, .. } = &outcome {
            // Recomputing is idempotent and heals a rollup write that was
            // lost after the row itself was stored.
            if entity.state().status.is_terminal() {
                self.recompute_rollup(entity).await?;
            }
            return Ok(outcome);
        }

        let entity = outcome.entity().clone();
        match self.run_effects(&entity, &effects).await {
            Ok(()) => Ok(outcome),
            Err(PipelineError::Queue(err)) => {
                // The row already moved; without its job it would sit in
                // PROCESSING forever.
                error!(
                    entity = %target,
                    event = event.name(),
                    "Could not enqueue follow-up job: {}",
                    err
                );
                let fail = OutputEvent::Fail {
                    error: "Could not schedule generation, please try again".to_string(),
                };
                let (failed, fail_effects) = self.transition(target, &fail).await?;
                if failed.is_applied() {
                    self.run_effects(failed.entity(), &fail_effects).await?;
                }
                Ok(failed)
            }
            Err(err) => Err(err),
        }
    }

    /// Move a row to FAILED with `message`. Finished rows are left alone.
    pub async fn fail(
        &self,
        target: &EntityRef,
        message: impl Into<String>,
    ) -> PipelineResult<ApplyOutcome> {
        self.apply(
            target,
            OutputEvent::Fail {
                error: message.into(),
            },
        )
        .await
    }

    /// Human approval of a SCRIPT_READY row; starts media generation.
    pub async fn approve_script(
        &self,
        target: &EntityRef,
        script: Option<String>,
    ) -> PipelineResult<Entity> {
        let outcome = self.apply(target, OutputEvent::ApproveScript { script }).await?;
        Ok(outcome.into_entity())
    }

    /// Start a fresh cycle for a finished row.
    pub async fn regenerate(&self, target: &EntityRef) -> PipelineResult<Entity> {
        let outcome = self.apply(target, OutputEvent::Regenerate).await?;
        Ok(outcome.into_entity())
    }

    /// Plan and conditionally write one transition, re-planning on conflict.
    async fn transition(
        &self,
        target: &EntityRef,
        event: &OutputEvent,
    ) -> PipelineResult<(ApplyOutcome, Vec<Effect>)> {
        let store = self.ctx.store.as_ref();
        let attempts = self.ctx.settings.max_transition_attempts.max(1);

        for attempt in 1..=attempts {
            let mut entity = Entity::load(store, target).await?;
            let planned = plan(
                entity.kind(),
                entity.config(),
                entity.state(),
                event,
                Utc::now(),
            );

            let transition = match planned {
                Ok(t) => t,
                Err(reason) if reason.is_noop() => {
                    info!(
                        entity = %target,
                        event = event.name(),
                        status = %entity.state().status,
                        "Skipping event: {}",
                        reason
                    );
                    metrics::counter!("studio_transitions_ignored_total", "event" => event.name())
                        .increment(1);
                    return Ok((ApplyOutcome::Ignored { entity, reason }, Vec::new()));
                }
                Err(reason) => {
                    warn!(
                        entity = %target,
                        event = event.name(),
                        "Rejected event: {}",
                        reason
                    );
                    return Err(PipelineError::InvalidStateTransition(reason));
                }
            };

            let version = entity.version();
            entity.set_state(transition.state);
            match entity.save(store, version).await {
                Ok(saved) => {
                    if transition.from != transition.to {
                        info!(
                            entity = %target,
                            event = event.name(),
                            "Status {} -> {}",
                            transition.from,
                            transition.to
                        );
                    } else {
                        debug!(entity = %target, event = event.name(), "State updated");
                    }
                    metrics::counter!(
                        "studio_transitions_total",
                        "event" => event.name(),
                        "to" => transition.to.as_str()
                    )
                    .increment(1);
                    return Ok((
                        ApplyOutcome::Applied {
                            entity: saved,
                            from: transition.from,
                            to: transition.to,
                        },
                        transition.effects,
                    ));
                }
                Err(StoreError::Conflict { .. }) => {
                    debug!(
                        entity = %target,
                        attempt,
                        "Concurrent write, re-planning {}",
                        event.name()
                    );
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(PipelineError::Contended(target.to_string()))
    }

    async fn run_effects(&self, entity: &Entity, effects: &[Effect]) -> PipelineResult<()> {
        for effect in effects {
            match job_for_effect(entity, effect) {
                Some(job) => {
                    let receipt = self.ctx.queue.enqueue(job.clone()).await?;
                    if receipt.deduplicated {
                        debug!(
                            job_type = job.job_type(),
                            job_id = %receipt.job_id,
                            "Job already queued"
                        );
                    }
                }
                None => self.recompute_rollup(entity).await?,
            }
        }
        Ok(())
    }

    async fn recompute_rollup(&self, entity: &Entity) -> PipelineResult<()> {
        if let Some(submission_id) = entity.submission_id() {
            RollupService::new(self.ctx.clone())
                .recompute(submission_id)
                .await?;
        }
        Ok(())
    }
}

/// Translate an effect into the job that performs it.
///
/// `RecomputeRollup` is handled inline and has no job.
fn job_for_effect(entity: &Entity, effect: &Effect) -> Option<QueueJob> {
    let organization_id = entity.organization_id().clone();
    let job = match effect {
        Effect::EnqueueScriptGeneration => QueueJob::GenerateScript(EntityJob {
            entity: entity.entity_ref(),
            organization_id,
        }),
        Effect::EnqueueMediaGeneration => match entity {
            Entity::Output(o) => {
                QueueJob::generate_output(o.kind, OutputJob::new(o.id.clone(), organization_id))
            }
            Entity::Standalone(v) => QueueJob::GenerateStandaloneVideo(StandaloneVideoJob {
                standalone_video_id: v.id.clone(),
                organization_id,
            }),
        },
        Effect::EnqueueCaptionEditing { video_url } => {
            QueueJob::SubmitCaptionEditing(CaptionEditingJob {
                entity: entity.entity_ref(),
                organization_id,
                video_url: video_url.clone(),
            })
        }
        Effect::EnqueuePostProcessing { media_url } => {
            let job = PostProcessJob {
                entity_id: entity.entity_ref().id().to_string(),
                organization_id: Some(organization_id),
                edited_video_url: media_url.clone(),
            };
            match entity {
                Entity::Output(_) => QueueJob::PostProcessVideoOutput(job),
                Entity::Standalone(_) => QueueJob::PostProcessStandaloneVideo(job),
            }
        }
        Effect::EnqueueCompletion {
            provider_video_id,
            video_url,
        } => QueueJob::ProcessVideoCompletion(VideoCompletionJob {
            provider_video_id: provider_video_id.clone(),
            video_url: video_url.clone(),
        }),
        Effect::RecomputeRollup => return None,
    };
    Some(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_models::{GenerationConfig, OrganizationId, Output, OutputKind, SubmissionId};

    fn output(kind: OutputKind) -> Entity {
        Entity::Output(Output::new(
            SubmissionId::from("sub-1"),
            OrganizationId::from("org"),
            kind,
            GenerationConfig::default(),
        ))
    }

    #[test]
    fn test_media_generation_job_follows_kind() {
        let job = job_for_effect(&output(OutputKind::Quiz), &Effect::EnqueueMediaGeneration)
            .unwrap();
        assert_eq!(job.job_type(), "generate-quiz");
    }

    #[test]
    fn test_post_processing_job_names_table() {
        let entity = output(OutputKind::Video);
        let job = job_for_effect(
            &entity,
            &Effect::EnqueuePostProcessing {
                media_url: "https://cdn/edited.mp4".into(),
            },
        )
        .unwrap();
        match job {
            QueueJob::PostProcessVideoOutput(j) => {
                assert_eq!(j.entity_id, entity.entity_ref().id());
                assert_eq!(j.edited_video_url, "https://cdn/edited.mp4");
                assert_eq!(j.organization_id, Some(OrganizationId::from("org")));
            }
            other => panic!("unexpected job {:?}", other),
        }
    }

    #[test]
    fn test_rollup_has_no_job() {
        assert!(job_for_effect(&output(OutputKind::Audio), &Effect::RecomputeRollup).is_none());
    }
}
