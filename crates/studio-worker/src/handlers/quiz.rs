use studio_models::{Artifact, EntityRef};
use studio_providers::TextRequest;
use studio_queue::OutputJob;

use super::JobHandlers;
use crate::error::WorkerResult;
use crate::prompts;

pub(crate) async fn generate_quiz(h: &JobHandlers, job: &OutputJob) -> WorkerResult<()> {
    let target = EntityRef::Output(job.output_id.clone());
    let Some(entity) = h.load_processing(&target).await? else {
        return Ok(());
    };
    let article = h.source_article(&entity).await?;
    let raw = h
        .generate_text(
            TextRequest::new(
                prompts::QUIZ_SYSTEM,
                prompts::from_article(&article.title, &article.content),
            )
            .json(),
        )
        .await?;
    let quiz = prompts::parse_quiz(&raw)?;
    h.finish(&target, Artifact::data(quiz)).await
}
