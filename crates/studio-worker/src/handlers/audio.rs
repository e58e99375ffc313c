//! Synchronous audio outputs: podcast, narration and interactive podcast.

use serde_json::json;
use studio_models::{Artifact, EntityRef};
use studio_pipeline::Entity;
use studio_providers::TextRequest;
use studio_queue::OutputJob;
use studio_storage::{object_key, MediaCategory};
use tracing::info;

use super::JobHandlers;
use crate::error::{WorkerError, WorkerResult};
use crate::prompts::{self, Speaker};

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

fn voice_for(h: &JobHandlers, entity: &Entity, speaker: Speaker) -> String {
    let config = entity.config();
    match speaker {
        Speaker::Host => config
            .voice_id
            .clone()
            .unwrap_or_else(|| h.config.narrator_voice_id.clone()),
        Speaker::Guest => config
            .secondary_voice_id
            .clone()
            .unwrap_or_else(|| h.config.guest_voice_id.clone()),
    }
}

async fn upload_audio(
    h: &JobHandlers,
    entity: &Entity,
    category: MediaCategory,
    file_name: &str,
    bytes: Vec<u8>,
) -> WorkerResult<String> {
    let key = object_key(
        entity.organization_id(),
        category,
        entity.entity_ref().id(),
        file_name,
    )?;
    Ok(h.ctx
        .storage
        .upload_bytes(bytes, &key, AUDIO_CONTENT_TYPE)
        .await?)
}

/// Voice an approved two-speaker script, one synthesis call per line.
pub(crate) async fn generate_podcast(h: &JobHandlers, job: &OutputJob) -> WorkerResult<()> {
    let target = EntityRef::Output(job.output_id.clone());
    let Some(entity) = h.load_processing(&target).await? else {
        return Ok(());
    };
    let script = entity
        .state()
        .script
        .clone()
        .ok_or_else(|| WorkerError::job_failed("Podcast has no script to voice"))?;
    let lines = prompts::parse_dialogue(&script)?;

    // MP3 frames concatenate into a playable stream
    let mut audio = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let voice = voice_for(h, &entity, line.speaker);
        let clip = h.synthesize(&line.text, &voice).await?;
        audio.extend_from_slice(&clip.bytes);
        info!(entity = %target, line = i + 1, total = lines.len(), "Voiced podcast line");
    }

    let file_name = format!("podcast-c{}.mp3", entity.state().cycle);
    let url = upload_audio(h, &entity, MediaCategory::Podcast, &file_name, audio).await?;
    h.finish(&target, Artifact::media(url).with_transcript(Some(script)))
        .await
}

pub(crate) async fn generate_narration(h: &JobHandlers, job: &OutputJob) -> WorkerResult<()> {
    let target = EntityRef::Output(job.output_id.clone());
    let Some(entity) = h.load_processing(&target).await? else {
        return Ok(());
    };
    let article = h.source_article(&entity).await?;
    let narration = h
        .generate_text(TextRequest::new(
            prompts::NARRATION_SYSTEM,
            prompts::from_article(&article.title, &article.content),
        ))
        .await?;

    let voice = voice_for(h, &entity, Speaker::Host);
    let clip = h.synthesize(&narration, &voice).await?;
    let file_name = format!("narration-c{}.mp3", entity.state().cycle);
    let url = upload_audio(h, &entity, MediaCategory::Audio, &file_name, clip.bytes).await?;
    h.finish(&target, Artifact::media(url).with_transcript(Some(narration)))
        .await
}

/// Segments are voiced and stored separately so a player can pause for
/// each check-in question.
pub(crate) async fn generate_interactive_podcast(
    h: &JobHandlers,
    job: &OutputJob,
) -> WorkerResult<()> {
    let target = EntityRef::Output(job.output_id.clone());
    let Some(entity) = h.load_processing(&target).await? else {
        return Ok(());
    };
    let article = h.source_article(&entity).await?;
    let raw = h
        .generate_text(
            TextRequest::new(
                prompts::INTERACTIVE_SYSTEM,
                prompts::from_article(&article.title, &article.content),
            )
            .json(),
        )
        .await?;
    let segments = prompts::parse_segments(&raw)?;

    let cycle = entity.state().cycle;
    let mut voiced = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let voice = voice_for(h, &entity, segment.speaker);
        let clip = h.synthesize(&segment.text, &voice).await?;
        let file_name = format!("segment-{}-c{}.mp3", i + 1, cycle);
        let url = upload_audio(h, &entity, MediaCategory::Podcast, &file_name, clip.bytes).await?;
        voiced.push(json!({
            "speaker": segment.speaker,
            "text": segment.text,
            "question": segment.question,
            "audioUrl": url,
        }));
    }

    info!(entity = %target, segments = voiced.len(), "Voiced interactive podcast");
    h.finish(&target, Artifact::data(json!({ "segments": voiced })))
        .await
}
