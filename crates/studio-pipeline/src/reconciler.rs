//! Provider webhook reconciliation.
//!
//! Callbacks carry nothing but an opaque provider id and an outcome. The
//! reconciler finds the single row currently holding that id, then feeds
//! the outcome into the normal lifecycle, so redeliveries, stale ids from
//! abandoned cycles and callbacks for finished rows all fall out as no-ops.
//!
//! Every payload with a correlating id is acknowledged. Only a payload
//! without any id is rejected, as a validation error.

use std::sync::Arc;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use studio_models::{EntityRef, MediaStage, OutputEvent, OutputStatus, ProviderHandle};
use studio_store::{Store, StoreResult};
use tracing::{error, info, warn};

use crate::context::PipelineContext;
use crate::entity::Entity;
use crate::error::{PipelineError, PipelineResult};
use crate::lifecycle::{ApplyOutcome, OutputService};

type HmacSha256 = Hmac<Sha256>;

/// Normalized outcome reported by a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Completed { url: String },
    Failed { error: String },
    /// Progress notification or unknown event; nothing to apply.
    InProgress { status: Option<String> },
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn error_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(obj @ Value::Object(_)) => string_field(obj, &["message", "detail"]),
        _ => None,
    })
}

/// Caption editing (Submagic) callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionCallback {
    pub project_id: String,
    pub outcome: CallbackOutcome,
}

impl CaptionCallback {
    /// Parse a callback body without trusting its shape.
    ///
    /// A playable URL means the project completed, whatever the status
    /// field says.
    pub fn from_json(value: &Value) -> PipelineResult<Self> {
        let project_id = string_field(value, &["projectId", "id", "project_id"])
            .ok_or_else(|| PipelineError::validation("Missing projectId"))?;

        let status = value
            .get("status")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_ascii_lowercase());
        let url = string_field(value, &["directUrl", "downloadUrl", "videoUrl"]);
        let error = error_text(value, &["error", "errorMessage", "message"]);

        let outcome = match (url, status.as_deref()) {
            (Some(url), _) => CallbackOutcome::Completed { url },
            (None, Some("failed" | "error" | "failure")) => CallbackOutcome::Failed {
                error: error.unwrap_or_else(|| "Caption editing failed".to_string()),
            },
            (None, None) if error.is_some() => CallbackOutcome::Failed {
                error: error.unwrap_or_default(),
            },
            (None, status) => CallbackOutcome::InProgress {
                status: status.map(str::to_string),
            },
        };

        Ok(Self {
            project_id,
            outcome,
        })
    }
}

/// Avatar video (HeyGen) callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarCallback {
    pub video_id: String,
    pub outcome: CallbackOutcome,
}

impl AvatarCallback {
    pub fn from_json(value: &Value) -> PipelineResult<Self> {
        let data = value.get("event_data").unwrap_or(value);
        let video_id = string_field(data, &["video_id", "videoId"])
            .ok_or_else(|| PipelineError::validation("Missing video_id"))?;
        let event_type = value
            .get("event_type")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let outcome = match event_type {
            "avatar_video.success" => match string_field(data, &["url", "video_url"]) {
                Some(url) => CallbackOutcome::Completed { url },
                None => CallbackOutcome::InProgress {
                    status: Some("success_without_url".to_string()),
                },
            },
            "avatar_video.fail" => CallbackOutcome::Failed {
                error: error_text(data, &["msg", "error", "message"])
                    .unwrap_or_else(|| "Avatar video generation failed".to_string()),
            },
            other => CallbackOutcome::InProgress {
                status: Some(other.to_string()),
            },
        };

        Ok(Self { video_id, outcome })
    }
}

/// Check a hex HMAC-SHA256 signature of `body` in constant time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// What a callback did. Always acknowledged to the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Applied { entity: EntityRef, status: OutputStatus },
    /// Redelivery, or the row already finished
    AlreadyHandled { entity: EntityRef },
    /// Progress notification; nothing changed
    InProgress,
    /// No live row holds the handle
    Orphaned,
    /// More than one row holds the handle
    Ambiguous,
    /// The row is not in a state that accepts this callback
    Rejected { entity: EntityRef, reason: String },
    /// Internal failure, logged
    Error { message: String },
}

impl ReconcileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied { .. } => "applied",
            ReconcileOutcome::AlreadyHandled { .. } => "duplicate",
            ReconcileOutcome::InProgress => "in_progress",
            ReconcileOutcome::Orphaned => "orphaned",
            ReconcileOutcome::Ambiguous => "ambiguous",
            ReconcileOutcome::Rejected { .. } => "rejected",
            ReconcileOutcome::Error { .. } => "error",
        }
    }
}

/// One table a provider handle may live in.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every row of this table currently holding `handle`.
    async fn find(&self, store: &dyn Store, handle: &ProviderHandle) -> StoreResult<Vec<Entity>>;
}

/// Video outputs of submissions.
pub struct VideoOutputLookup;

#[async_trait]
impl LookupStrategy for VideoOutputLookup {
    fn name(&self) -> &'static str {
        "video_output"
    }

    async fn find(&self, store: &dyn Store, handle: &ProviderHandle) -> StoreResult<Vec<Entity>> {
        Ok(store
            .outputs_by_handle(handle)
            .await?
            .into_iter()
            .filter(|o| o.kind.awaits_provider_callbacks())
            .map(Entity::Output)
            .collect())
    }
}

/// Standalone videos.
pub struct StandaloneVideoLookup;

#[async_trait]
impl LookupStrategy for StandaloneVideoLookup {
    fn name(&self) -> &'static str {
        "standalone_video"
    }

    async fn find(&self, store: &dyn Store, handle: &ProviderHandle) -> StoreResult<Vec<Entity>> {
        Ok(store
            .standalone_by_handle(handle)
            .await?
            .into_iter()
            .map(Entity::Standalone)
            .collect())
    }
}

/// Resolves provider callbacks to rows and advances them.
#[derive(Clone)]
pub struct Reconciler {
    ctx: Arc<PipelineContext>,
    outputs: OutputService,
    strategies: Arc<Vec<Box<dyn LookupStrategy>>>,
}

impl Reconciler {
    /// Reconciler searching video outputs first, then standalone videos.
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self::with_strategies(
            ctx,
            vec![Box::new(VideoOutputLookup), Box::new(StandaloneVideoLookup)],
        )
    }

    pub fn with_strategies(ctx: Arc<PipelineContext>, strategies: Vec<Box<dyn LookupStrategy>>) -> Self {
        Self {
            outputs: OutputService::new(ctx.clone()),
            ctx,
            strategies: Arc::new(strategies),
        }
    }

    /// Find the single row holding `handle`.
    ///
    /// Every table is searched, in order. `Ok(None)` when no row holds the
    /// handle; `DataIntegrity` when more than one row does, whether in one
    /// table or across several.
    pub async fn resolve(&self, handle: &ProviderHandle) -> PipelineResult<Option<Entity>> {
        let store = self.ctx.store.as_ref();
        let mut matches = Vec::new();
        let mut holders = Vec::new();
        for strategy in self.strategies.iter() {
            let found = strategy.find(store, handle).await?;
            if !found.is_empty() {
                holders.push(format!("{} {}", found.len(), strategy.name()));
                matches.extend(found);
            }
        }

        if matches.len() > 1 {
            return Err(PipelineError::data_integrity(format!(
                "provider id {} is held by {} rows ({})",
                handle.id(),
                matches.len(),
                holders.join(", ")
            )));
        }
        Ok(matches.pop())
    }

    /// Handle a caption editing callback body.
    ///
    /// Fails only when the body has no project id.
    pub async fn handle_caption(&self, body: &Value) -> PipelineResult<ReconcileOutcome> {
        let callback = CaptionCallback::from_json(body)?;
        let handle = ProviderHandle::CaptionProject(callback.project_id.clone());
        let outcome = self
            .reconcile(&handle, MediaStage::Edited, callback.outcome)
            .await;
        record("submagic", &outcome);
        Ok(outcome)
    }

    /// Handle an avatar video callback body.
    pub async fn handle_avatar(&self, body: &Value) -> PipelineResult<ReconcileOutcome> {
        let callback = AvatarCallback::from_json(body)?;
        let handle = ProviderHandle::AvatarVideo(callback.video_id.clone());
        let outcome = self
            .reconcile(&handle, MediaStage::Avatar, callback.outcome)
            .await;
        record("heygen", &outcome);
        Ok(outcome)
    }

    async fn reconcile(
        &self,
        handle: &ProviderHandle,
        stage: MediaStage,
        outcome: CallbackOutcome,
    ) -> ReconcileOutcome {
        let provider_id = handle.id();

        let event = match outcome {
            CallbackOutcome::Completed { url } => OutputEvent::MediaReady { stage, url },
            CallbackOutcome::Failed { error } => OutputEvent::Fail { error },
            CallbackOutcome::InProgress { status } => {
                info!(provider_id, ?status, "Progress callback, nothing to apply");
                return ReconcileOutcome::InProgress;
            }
        };

        let entity = match self.resolve(handle).await {
            Ok(Some(entity)) => entity,
            Ok(None) => {
                warn!(
                    provider_id,
                    "No video output or standalone video holds this provider id"
                );
                return ReconcileOutcome::Orphaned;
            }
            Err(PipelineError::DataIntegrity(msg)) => {
                error!(provider_id, "Refusing to pick a row: {}", msg);
                return ReconcileOutcome::Ambiguous;
            }
            Err(err) => {
                error!(provider_id, "Lookup failed: {}", err);
                return ReconcileOutcome::Error {
                    message: err.to_string(),
                };
            }
        };

        let target = entity.entity_ref();
        if entity.state().status.is_terminal() {
            info!(
                provider_id,
                entity = %target,
                status = %entity.state().status,
                "Callback for finished row, skipping"
            );
            return ReconcileOutcome::AlreadyHandled { entity: target };
        }

        match self.outputs.apply(&target, event).await {
            Ok(ApplyOutcome::Applied { to, .. }) => {
                info!(provider_id, entity = %target, status = %to, "Callback applied");
                ReconcileOutcome::Applied {
                    entity: target,
                    status: to,
                }
            }
            Ok(ApplyOutcome::Ignored { reason, .. }) => {
                info!(provider_id, entity = %target, "Duplicate callback: {}", reason);
                ReconcileOutcome::AlreadyHandled { entity: target }
            }
            Err(PipelineError::InvalidStateTransition(reason)) => {
                warn!(
                    provider_id,
                    entity = %target,
                    "Callback does not fit current state: {}",
                    reason
                );
                ReconcileOutcome::Rejected {
                    entity: target,
                    reason: reason.to_string(),
                }
            }
            Err(err) => {
                error!(provider_id, entity = %target, "Failed to apply callback: {}", err);
                ReconcileOutcome::Error {
                    message: err.to_string(),
                }
            }
        }
    }
}

fn record(provider: &'static str, outcome: &ReconcileOutcome) {
    metrics::counter!(
        "studio_webhooks_total",
        "provider" => provider,
        "outcome" => outcome.label()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_caption_url_implies_completion() {
        let callback = CaptionCallback::from_json(&json!({
            "projectId": "sm-1",
            "status": "weird",
            "downloadUrl": "https://cdn/edited.mp4"
        }))
        .unwrap();
        assert_eq!(
            callback.outcome,
            CallbackOutcome::Completed {
                url: "https://cdn/edited.mp4".into()
            }
        );
    }

    #[test]
    fn test_caption_id_fallback_and_failure() {
        let callback = CaptionCallback::from_json(&json!({
            "id": "sm-2",
            "status": "FAILED",
            "error": "Video too long"
        }))
        .unwrap();
        assert_eq!(callback.project_id, "sm-2");
        assert_eq!(
            callback.outcome,
            CallbackOutcome::Failed {
                error: "Video too long".into()
            }
        );
    }

    #[test]
    fn test_caption_url_preference_order() {
        let callback = CaptionCallback::from_json(&json!({
            "projectId": "sm-3",
            "videoUrl": "https://cdn/video.mp4",
            "directUrl": "https://cdn/direct.mp4"
        }))
        .unwrap();
        assert_eq!(
            callback.outcome,
            CallbackOutcome::Completed {
                url: "https://cdn/direct.mp4".into()
            }
        );
    }

    #[test]
    fn test_caption_without_id_is_rejected() {
        let err = CaptionCallback::from_json(&json!({ "status": "completed" })).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        let err = CaptionCallback::from_json(&json!({ "projectId": "  " })).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_caption_progress_is_not_applied() {
        let callback = CaptionCallback::from_json(&json!({
            "projectId": "sm-4",
            "status": "processing"
        }))
        .unwrap();
        assert_eq!(
            callback.outcome,
            CallbackOutcome::InProgress {
                status: Some("processing".into())
            }
        );
    }

    #[test]
    fn test_avatar_events() {
        let ok = AvatarCallback::from_json(&json!({
            "event_type": "avatar_video.success",
            "event_data": { "video_id": "hg-1", "url": "https://cdn/avatar.mp4" }
        }))
        .unwrap();
        assert_eq!(ok.video_id, "hg-1");
        assert!(matches!(ok.outcome, CallbackOutcome::Completed { .. }));

        let failed = AvatarCallback::from_json(&json!({
            "event_type": "avatar_video.fail",
            "event_data": { "video_id": "hg-2", "msg": "Avatar not found" }
        }))
        .unwrap();
        assert_eq!(
            failed.outcome,
            CallbackOutcome::Failed {
                error: "Avatar not found".into()
            }
        );
    }

    #[test]
    fn test_signature_verification() {
        let body = br#"{"event_type":"avatar_video.success"}"#;
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_signature("secret", body, &signature));
        assert!(!verify_signature("other", body, &signature));
        assert!(!verify_signature("secret", body, "not-hex"));
    }
}
