//! Generation state machine shared by every output kind.
//!
//! [`plan`] is pure: given the persisted state of a row and an event it
//! returns the next state together with the side effects the caller must
//! run (enqueue a job, recompute a rollup). Persistence and job dispatch
//! live in the pipeline crate, which applies a [`Transition`] with a
//! conditional write and only then executes its effects.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::output::{Artifact, OutputKind};
use crate::status::OutputStatus;

/// Opaque ids assigned by asynchronous providers.
///
/// Each id is the only key a webhook can use to find this row. Both are
/// cleared when a new generation cycle starts so that late callbacks for
/// an abandoned attempt no longer resolve.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProviderHandles {
    /// Avatar video id (HeyGen)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_video_id: Option<String>,
    /// Caption editing project id (Submagic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_project_id: Option<String>,
}

impl ProviderHandles {
    pub fn is_empty(&self) -> bool {
        self.avatar_video_id.is_none() && self.caption_project_id.is_none()
    }

    /// Whether `handle` is the id currently stored in its slot.
    pub fn holds(&self, handle: &ProviderHandle) -> bool {
        self.slot(handle).as_deref() == Some(handle.id())
    }

    fn slot(&self, handle: &ProviderHandle) -> &Option<String> {
        match handle {
            ProviderHandle::AvatarVideo(_) => &self.avatar_video_id,
            ProviderHandle::CaptionProject(_) => &self.caption_project_id,
        }
    }

    fn slot_mut(&mut self, handle: &ProviderHandle) -> &mut Option<String> {
        match handle {
            ProviderHandle::AvatarVideo(_) => &mut self.avatar_video_id,
            ProviderHandle::CaptionProject(_) => &mut self.caption_project_id,
        }
    }
}

/// A handle returned by an asynchronous provider, tagged by slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "slot", content = "id", rename_all = "snake_case")]
pub enum ProviderHandle {
    AvatarVideo(String),
    CaptionProject(String),
}

impl ProviderHandle {
    pub fn id(&self) -> &str {
        match self {
            ProviderHandle::AvatarVideo(id) | ProviderHandle::CaptionProject(id) => id,
        }
    }
}

/// Intermediate media produced on the way to a finished video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaStage {
    /// Raw avatar render
    Avatar,
    /// Captioned / edited render
    Edited,
    /// Bumpers and music composited on top
    Composited,
}

/// Persisted generation state, embedded in outputs and standalone videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationState {
    #[serde(default)]
    pub status: OutputStatus,
    /// Human-readable reason, set only while FAILED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default)]
    pub handles: ProviderHandles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    /// Set while a provider callback is outstanding; read by the reaper
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting_provider_since: Option<DateTime<Utc>>,
    /// Generation cycle, bumped by every regeneration
    #[serde(default)]
    pub cycle: u32,
    pub updated_at: DateTime<Utc>,
}

impl GenerationState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            status: OutputStatus::Pending,
            error: None,
            script: None,
            handles: ProviderHandles::default(),
            avatar_url: None,
            edited_url: None,
            composite_url: None,
            artifact: None,
            awaiting_provider_since: None,
            cycle: 0,
            updated_at: now,
        }
    }

    pub fn has_script(&self) -> bool {
        self.script.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    fn stage_url(&self, stage: MediaStage) -> &Option<String> {
        match stage {
            MediaStage::Avatar => &self.avatar_url,
            MediaStage::Edited => &self.edited_url,
            MediaStage::Composited => &self.composite_url,
        }
    }

    fn stage_url_mut(&mut self, stage: MediaStage) -> &mut Option<String> {
        match stage {
            MediaStage::Avatar => &mut self.avatar_url,
            MediaStage::Edited => &mut self.edited_url,
            MediaStage::Composited => &mut self.composite_url,
        }
    }
}

/// Something that happened to a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutputEvent {
    /// Kick off generation of a PENDING row
    Start,
    /// Script stage finished
    ScriptGenerated { script: String },
    /// Human approved the script (optionally edited) and requested media
    ApproveScript { script: Option<String> },
    /// An asynchronous provider accepted work and returned a handle
    ProviderAccepted { handle: ProviderHandle },
    /// An intermediate render became available
    MediaReady { stage: MediaStage, url: String },
    /// Final artifact produced
    Complete { artifact: Artifact },
    Fail { error: String },
    /// No provider callback arrived within the configured window
    TimedOut { waited_secs: u64 },
    /// Human-triggered fresh cycle for a finished row
    Regenerate,
}

impl OutputEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutputEvent::Start => "start",
            OutputEvent::ScriptGenerated { .. } => "script_generated",
            OutputEvent::ApproveScript { .. } => "approve_script",
            OutputEvent::ProviderAccepted { .. } => "provider_accepted",
            OutputEvent::MediaReady { .. } => "media_ready",
            OutputEvent::Complete { .. } => "complete",
            OutputEvent::Fail { .. } => "fail",
            OutputEvent::TimedOut { .. } => "timed_out",
            OutputEvent::Regenerate => "regenerate",
        }
    }

    /// Events raised by humans rather than by jobs or webhooks.
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            OutputEvent::ApproveScript { .. } | OutputEvent::Regenerate
        )
    }
}

/// Work the caller must perform after persisting a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    EnqueueScriptGeneration,
    EnqueueMediaGeneration,
    EnqueueCaptionEditing {
        video_url: String,
    },
    EnqueuePostProcessing {
        media_url: String,
    },
    EnqueueCompletion {
        provider_video_id: String,
        video_url: String,
    },
    RecomputeRollup,
}

/// Planned change of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: OutputStatus,
    pub to: OutputStatus,
    /// Full next state, ready to be written
    pub state: GenerationState,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn status_changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("row is already {status}")]
    Terminal { status: OutputStatus },

    #[error("event already applied")]
    Duplicate,

    #[error("cannot apply {event} while {from}")]
    Invalid {
        from: OutputStatus,
        event: &'static str,
    },

    #[error("script must not be empty")]
    EmptyScript,

    #[error("media url must not be empty")]
    EmptyMedia,

    #[error("no provider handle recorded for this stage")]
    NoProviderHandle,

    #[error("provider handle {incoming} conflicts with recorded {existing}")]
    HandleConflict { existing: String, incoming: String },
}

impl TransitionError {
    /// Redeliveries and events against finished rows are skipped silently.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            TransitionError::Terminal { .. } | TransitionError::Duplicate
        )
    }
}

/// Plan the effect of `event` on a row of `kind` in `state`.
pub fn plan(
    kind: OutputKind,
    config: &GenerationConfig,
    state: &GenerationState,
    event: &OutputEvent,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    let from = state.status;
    let mut next = state.clone();
    next.updated_at = now;
    let mut effects = Vec::new();

    let invalid = || TransitionError::Invalid {
        from,
        event: event.name(),
    };

    // Manual events report the current state instead of silently
    // skipping, so a caller sees why the request was refused.
    if from.is_terminal() && !event.is_manual() {
        return Err(TransitionError::Terminal { status: from });
    }

    match event {
        OutputEvent::Start => {
            if from.is_started() {
                return Err(TransitionError::Duplicate);
            }
            next.status = OutputStatus::Processing;
            effects.push(initial_stage(kind, state));
        }

        OutputEvent::ScriptGenerated { script } => {
            if !kind.supports_script_approval() {
                return Err(invalid());
            }
            if from == OutputStatus::ScriptReady || state.has_script() {
                return Err(TransitionError::Duplicate);
            }
            if from != OutputStatus::Processing {
                return Err(invalid());
            }
            if script.trim().is_empty() {
                return Err(TransitionError::EmptyScript);
            }
            next.script = Some(script.clone());
            if config.script_approval {
                next.status = OutputStatus::ScriptReady;
            } else {
                effects.push(Effect::EnqueueMediaGeneration);
            }
        }

        OutputEvent::ApproveScript { script } => {
            if from != OutputStatus::ScriptReady {
                return Err(invalid());
            }
            let approved = script.clone().or_else(|| state.script.clone());
            match approved {
                Some(s) if !s.trim().is_empty() => next.script = Some(s),
                _ => return Err(TransitionError::EmptyScript),
            }
            next.status = OutputStatus::Processing;
            effects.push(Effect::EnqueueMediaGeneration);
        }

        OutputEvent::ProviderAccepted { handle } => {
            if from != OutputStatus::Processing {
                return Err(invalid());
            }
            if handle.id().is_empty() {
                return Err(TransitionError::NoProviderHandle);
            }
            match state.handles.slot(handle) {
                Some(existing) if existing == handle.id() => {
                    return Err(TransitionError::Duplicate)
                }
                Some(existing) => {
                    return Err(TransitionError::HandleConflict {
                        existing: existing.clone(),
                        incoming: handle.id().to_string(),
                    })
                }
                None => {}
            }
            *next.handles.slot_mut(handle) = Some(handle.id().to_string());
            next.awaiting_provider_since = Some(now);
        }

        OutputEvent::MediaReady { stage, url } => {
            if from != OutputStatus::Processing {
                return Err(invalid());
            }
            if url.trim().is_empty() {
                return Err(TransitionError::EmptyMedia);
            }
            let required = match stage {
                MediaStage::Edited => &state.handles.caption_project_id,
                MediaStage::Avatar | MediaStage::Composited => &state.handles.avatar_video_id,
            };
            if required.is_none() {
                return Err(TransitionError::NoProviderHandle);
            }
            if state.stage_url(*stage).is_some() {
                return Err(TransitionError::Duplicate);
            }
            *next.stage_url_mut(*stage) = Some(url.clone());
            next.awaiting_provider_since = None;

            let provider_video_id = state
                .handles
                .caption_project_id
                .clone()
                .or_else(|| state.handles.avatar_video_id.clone())
                .unwrap_or_default();
            let effect = match stage {
                MediaStage::Avatar if config.needs_caption_editing() => {
                    Effect::EnqueueCaptionEditing {
                        video_url: url.clone(),
                    }
                }
                MediaStage::Avatar | MediaStage::Edited => {
                    finishing_effect(config, provider_video_id, url.clone())
                }
                MediaStage::Composited => Effect::EnqueueCompletion {
                    provider_video_id,
                    video_url: url.clone(),
                },
            };
            effects.push(effect);
        }

        OutputEvent::Complete { artifact } => {
            if from != OutputStatus::Processing {
                return Err(invalid());
            }
            next.status = OutputStatus::Completed;
            next.error = None;
            next.artifact = Some(artifact.clone());
            next.awaiting_provider_since = None;
        }

        OutputEvent::Fail { error } => {
            next.status = OutputStatus::Failed;
            next.error = Some(normalize_error(error));
            next.awaiting_provider_since = None;
        }

        OutputEvent::TimedOut { waited_secs } => {
            next.status = OutputStatus::Failed;
            next.error = Some(format!(
                "Provider did not respond within {}s",
                waited_secs
            ));
            next.awaiting_provider_since = None;
        }

        OutputEvent::Regenerate => {
            if !from.is_terminal() {
                return Err(invalid());
            }
            next.status = OutputStatus::Processing;
            next.error = None;
            next.handles = ProviderHandles::default();
            next.avatar_url = None;
            next.edited_url = None;
            next.composite_url = None;
            next.artifact = None;
            next.awaiting_provider_since = None;
            next.cycle = state.cycle.saturating_add(1);
            effects.push(initial_stage(kind, &next));
        }
    }

    if next.status != from {
        effects.push(Effect::RecomputeRollup);
    }

    Ok(Transition {
        from,
        to: next.status,
        state: next,
        effects,
    })
}

fn initial_stage(kind: OutputKind, state: &GenerationState) -> Effect {
    if kind.supports_script_approval() && !state.has_script() {
        Effect::EnqueueScriptGeneration
    } else {
        Effect::EnqueueMediaGeneration
    }
}

/// Route a finished render through post-processing only when the row's
/// own configuration asks for bumpers or music.
fn finishing_effect(config: &GenerationConfig, provider_video_id: String, url: String) -> Effect {
    if config.needs_post_processing() {
        Effect::EnqueuePostProcessing { media_url: url }
    } else {
        Effect::EnqueueCompletion {
            provider_video_id,
            video_url: url,
        }
    }
}

fn normalize_error(error: &str) -> String {
    let trimmed = error.trim();
    if trimmed.is_empty() {
        "Generation failed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn step(
        kind: OutputKind,
        config: &GenerationConfig,
        state: &GenerationState,
        event: OutputEvent,
    ) -> Transition {
        plan(kind, config, state, &event, now()).unwrap()
    }

    fn processing_video(config: &GenerationConfig) -> GenerationState {
        let state = GenerationState::new(now());
        let mut state = step(OutputKind::Video, config, &state, OutputEvent::Start).state;
        state.script = Some("Hello".into());
        state
    }

    #[test]
    fn test_start_video_enqueues_script() {
        let config = GenerationConfig::default();
        let t = step(
            OutputKind::Video,
            &config,
            &GenerationState::new(now()),
            OutputEvent::Start,
        );
        assert_eq!(t.to, OutputStatus::Processing);
        assert_eq!(
            t.effects,
            vec![Effect::EnqueueScriptGeneration, Effect::RecomputeRollup]
        );
    }

    #[test]
    fn test_start_quiz_enqueues_media() {
        let config = GenerationConfig::default();
        let t = step(
            OutputKind::Quiz,
            &config,
            &GenerationState::new(now()),
            OutputEvent::Start,
        );
        assert_eq!(
            t.effects,
            vec![Effect::EnqueueMediaGeneration, Effect::RecomputeRollup]
        );
    }

    #[test]
    fn test_start_twice_is_duplicate() {
        let config = GenerationConfig::default();
        let started = step(
            OutputKind::Audio,
            &config,
            &GenerationState::new(now()),
            OutputEvent::Start,
        )
        .state;
        let err = plan(OutputKind::Audio, &config, &started, &OutputEvent::Start, now()).unwrap_err();
        assert_eq!(err, TransitionError::Duplicate);
        assert!(err.is_noop());
    }

    #[test]
    fn test_script_approval_flow() {
        let config = GenerationConfig::default().with_script_approval(true);
        let started = step(
            OutputKind::Podcast,
            &config,
            &GenerationState::new(now()),
            OutputEvent::Start,
        )
        .state;

        let ready = step(
            OutputKind::Podcast,
            &config,
            &started,
            OutputEvent::ScriptGenerated {
                script: "HOST: hi".into(),
            },
        );
        assert_eq!(ready.to, OutputStatus::ScriptReady);
        assert_eq!(ready.effects, vec![Effect::RecomputeRollup]);

        let approved = step(
            OutputKind::Podcast,
            &config,
            &ready.state,
            OutputEvent::ApproveScript {
                script: Some("HOST: edited".into()),
            },
        );
        assert_eq!(approved.to, OutputStatus::Processing);
        assert_eq!(approved.state.script.as_deref(), Some("HOST: edited"));
        assert_eq!(
            approved.effects,
            vec![Effect::EnqueueMediaGeneration, Effect::RecomputeRollup]
        );
    }

    #[test]
    fn test_script_without_approval_goes_to_media() {
        let config = GenerationConfig::default();
        let started = step(
            OutputKind::Video,
            &config,
            &GenerationState::new(now()),
            OutputEvent::Start,
        )
        .state;
        let t = step(
            OutputKind::Video,
            &config,
            &started,
            OutputEvent::ScriptGenerated {
                script: "Script".into(),
            },
        );
        assert_eq!(t.to, OutputStatus::Processing);
        assert_eq!(t.effects, vec![Effect::EnqueueMediaGeneration]);
    }

    #[test]
    fn test_media_generation_rejected_from_pending() {
        let config = GenerationConfig::default().with_script_approval(true);
        let err = plan(
            OutputKind::Video,
            &config,
            &GenerationState::new(now()),
            &OutputEvent::ApproveScript {
                script: Some("x".into()),
            },
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Invalid {
                from: OutputStatus::Pending,
                event: "approve_script"
            }
        );
        assert!(!err.is_noop());
    }

    #[test]
    fn test_approve_requires_non_empty_script() {
        let config = GenerationConfig::default().with_script_approval(true);
        let mut state = GenerationState::new(now());
        state.status = OutputStatus::ScriptReady;
        state.script = Some("  ".into());
        let err = plan(
            OutputKind::Video,
            &config,
            &state,
            &OutputEvent::ApproveScript { script: None },
            now(),
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::EmptyScript);
    }

    #[test]
    fn test_terminal_rows_ignore_automated_events() {
        let config = GenerationConfig::default();
        let mut state = GenerationState::new(now());
        state.status = OutputStatus::Completed;

        for event in [
            OutputEvent::Fail {
                error: "late".into(),
            },
            OutputEvent::TimedOut { waited_secs: 10 },
            OutputEvent::Complete {
                artifact: Artifact::media("https://cdn/x.mp4"),
            },
            OutputEvent::MediaReady {
                stage: MediaStage::Edited,
                url: "https://cdn/y.mp4".into(),
            },
        ] {
            let err = plan(OutputKind::Video, &config, &state, &event, now()).unwrap_err();
            assert!(err.is_noop(), "{:?} should be a no-op", event);
        }
    }

    #[test]
    fn test_provider_handle_recorded_once() {
        let config = GenerationConfig::default();
        let state = processing_video(&config);
        let handle = ProviderHandle::AvatarVideo("hg-1".into());
        let t = step(
            OutputKind::Video,
            &config,
            &state,
            OutputEvent::ProviderAccepted {
                handle: handle.clone(),
            },
        );
        assert!(t.state.handles.holds(&handle));
        assert!(t.state.awaiting_provider_since.is_some());
        assert!(t.effects.is_empty());

        let again = plan(
            OutputKind::Video,
            &config,
            &t.state,
            &OutputEvent::ProviderAccepted { handle },
            now(),
        )
        .unwrap_err();
        assert_eq!(again, TransitionError::Duplicate);

        let other = plan(
            OutputKind::Video,
            &config,
            &t.state,
            &OutputEvent::ProviderAccepted {
                handle: ProviderHandle::AvatarVideo("hg-2".into()),
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(other, TransitionError::HandleConflict { .. }));
    }

    #[test]
    fn test_edited_without_extras_goes_to_completion() {
        let config = GenerationConfig::default().with_captions("bold");
        let mut state = processing_video(&config);
        state.handles.avatar_video_id = Some("hg-1".into());
        state.avatar_url = Some("https://heygen/raw.mp4".into());
        state.handles.caption_project_id = Some("sm-1".into());

        let t = step(
            OutputKind::Video,
            &config,
            &state,
            OutputEvent::MediaReady {
                stage: MediaStage::Edited,
                url: "https://submagic/out.mp4".into(),
            },
        );
        assert_eq!(
            t.effects,
            vec![Effect::EnqueueCompletion {
                provider_video_id: "sm-1".into(),
                video_url: "https://submagic/out.mp4".into()
            }]
        );
        assert!(t.state.awaiting_provider_since.is_none());
    }

    #[test]
    fn test_edited_with_music_goes_to_post_processing() {
        let config = GenerationConfig::default()
            .with_captions("bold")
            .with_music("music-1");
        let mut state = processing_video(&config);
        state.handles.avatar_video_id = Some("hg-1".into());
        state.handles.caption_project_id = Some("sm-1".into());

        let t = step(
            OutputKind::Video,
            &config,
            &state,
            OutputEvent::MediaReady {
                stage: MediaStage::Edited,
                url: "https://submagic/out.mp4".into(),
            },
        );
        assert_eq!(
            t.effects,
            vec![Effect::EnqueuePostProcessing {
                media_url: "https://submagic/out.mp4".into()
            }]
        );

        let dup = plan(
            OutputKind::Video,
            &config,
            &t.state,
            &OutputEvent::MediaReady {
                stage: MediaStage::Edited,
                url: "https://submagic/out.mp4".into(),
            },
            now(),
        )
        .unwrap_err();
        assert_eq!(dup, TransitionError::Duplicate);
    }

    #[test]
    fn test_avatar_ready_routes_to_captions_when_styled() {
        let config = GenerationConfig::default().with_captions("bold");
        let mut state = processing_video(&config);
        state.handles.avatar_video_id = Some("hg-1".into());

        let t = step(
            OutputKind::Video,
            &config,
            &state,
            OutputEvent::MediaReady {
                stage: MediaStage::Avatar,
                url: "https://heygen/raw.mp4".into(),
            },
        );
        assert_eq!(
            t.effects,
            vec![Effect::EnqueueCaptionEditing {
                video_url: "https://heygen/raw.mp4".into()
            }]
        );
    }

    #[test]
    fn test_media_ready_requires_handle() {
        let config = GenerationConfig::default();
        let state = processing_video(&config);
        let err = plan(
            OutputKind::Video,
            &config,
            &state,
            &OutputEvent::MediaReady {
                stage: MediaStage::Edited,
                url: "https://submagic/out.mp4".into(),
            },
            now(),
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::NoProviderHandle);
    }

    #[test]
    fn test_fail_records_error_and_rolls_up() {
        let config = GenerationConfig::default();
        let state = processing_video(&config);
        let t = step(
            OutputKind::Video,
            &config,
            &state,
            OutputEvent::Fail {
                error: " render failed ".into(),
            },
        );
        assert_eq!(t.to, OutputStatus::Failed);
        assert_eq!(t.state.error.as_deref(), Some("render failed"));
        assert_eq!(t.effects, vec![Effect::RecomputeRollup]);
    }

    #[test]
    fn test_timeout_has_failure_shape() {
        let config = GenerationConfig::default();
        let state = processing_video(&config);
        let t = step(
            OutputKind::Video,
            &config,
            &state,
            OutputEvent::TimedOut { waited_secs: 3600 },
        );
        assert_eq!(t.to, OutputStatus::Failed);
        assert!(t.state.error.unwrap().contains("3600"));
    }

    #[test]
    fn test_regenerate_starts_fresh_cycle() {
        let config = GenerationConfig::default();
        let mut state = processing_video(&config);
        state.status = OutputStatus::Failed;
        state.error = Some("boom".into());
        state.handles.avatar_video_id = Some("hg-1".into());
        state.avatar_url = Some("https://heygen/raw.mp4".into());

        let t = step(OutputKind::Video, &config, &state, OutputEvent::Regenerate);
        assert_eq!(t.to, OutputStatus::Processing);
        assert!(t.state.error.is_none());
        assert!(t.state.handles.is_empty());
        assert!(t.state.avatar_url.is_none());
        assert_eq!(t.state.cycle, 1);
        assert_eq!(t.state.script.as_deref(), Some("Hello"));
        assert_eq!(
            t.effects,
            vec![Effect::EnqueueMediaGeneration, Effect::RecomputeRollup]
        );
    }

    #[test]
    fn test_regenerate_rejected_while_processing() {
        let config = GenerationConfig::default();
        let state = processing_video(&config);
        let err = plan(
            OutputKind::Video,
            &config,
            &state,
            &OutputEvent::Regenerate,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Invalid { .. }));
    }

    #[test]
    fn test_script_ready_not_reachable_for_quiz() {
        let config = GenerationConfig::default().with_script_approval(true);
        let started = step(
            OutputKind::Quiz,
            &config,
            &GenerationState::new(now()),
            OutputEvent::Start,
        )
        .state;
        let err = plan(
            OutputKind::Quiz,
            &config,
            &started,
            &OutputEvent::ScriptGenerated {
                script: "x".into(),
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Invalid { .. }));
    }
}
