//! Script generation for video and podcast rows.

use studio_models::{OutputEvent, OutputKind};
use studio_pipeline::Entity;
use studio_providers::TextRequest;
use studio_queue::EntityJob;
use tracing::info;

use super::JobHandlers;
use crate::error::{WorkerError, WorkerResult};
use crate::prompts;

pub(crate) async fn generate_script(h: &JobHandlers, job: &EntityJob) -> WorkerResult<()> {
    let Some(entity) = h.load_processing(&job.entity).await? else {
        return Ok(());
    };
    if entity.state().has_script() {
        info!(entity = %job.entity, "Script already generated, skipping");
        return Ok(());
    }

    let system = match entity.kind() {
        OutputKind::Video => prompts::VIDEO_SCRIPT_SYSTEM,
        OutputKind::Podcast => prompts::PODCAST_SCRIPT_SYSTEM,
        other => {
            return Err(WorkerError::job_failed(format!(
                "{} outputs have no script stage",
                other
            )))
        }
    };

    let prompt = match &entity {
        Entity::Output(_) => {
            let article = h.source_article(&entity).await?;
            prompts::from_article(&article.title, &article.content)
        }
        Entity::Standalone(video) => {
            let brief = video.prompt.as_deref().unwrap_or(&video.title);
            prompts::from_brief(&video.title, brief)
        }
    };

    let script = h.generate_text(TextRequest::new(system, prompt)).await?;
    if entity.kind() == OutputKind::Podcast {
        // Reject dialogue the podcast stage could not voice
        prompts::parse_dialogue(&script)?;
    }

    let outcome = h
        .outputs
        .apply(
            &job.entity,
            OutputEvent::ScriptGenerated {
                script: script.trim().to_string(),
            },
        )
        .await?;
    info!(
        entity = %job.entity,
        status = %outcome.entity().state().status,
        "Script generated"
    );
    Ok(())
}
