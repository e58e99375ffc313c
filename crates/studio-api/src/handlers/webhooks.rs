//! Provider callback endpoints.
//!
//! Both endpoints acknowledge every payload that names a provider id, even
//! when nothing could be applied; providers retry on non-2xx and a retry
//! cannot fix an orphaned or stale id.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use studio_pipeline::{verify_signature, ReconcileOutcome};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header HeyGen carries its HMAC-SHA256 body signature in.
pub const HEYGEN_SIGNATURE_HEADER: &str = "signature";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub outcome: &'static str,
}

impl From<ReconcileOutcome> for WebhookAck {
    fn from(outcome: ReconcileOutcome) -> Self {
        Self {
            success: true,
            outcome: outcome.label(),
        }
    }
}

fn parse_body(provider: &'static str, body: &Bytes) -> ApiResult<Value> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(provider, "Unparseable webhook body: {}", e);
        counter!("studio_webhooks_rejected_total", "provider" => provider).increment(1);
        ApiError::Validation("Body must be a JSON object with a project id".to_string())
    })
}

/// `POST /webhooks/submagic`
pub async fn submagic_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let payload = parse_body("submagic", &body)?;
    debug!(?payload, "Caption editing callback");
    let outcome = state.reconciler.handle_caption(&payload).await?;
    Ok(Json(outcome.into()))
}

/// `POST /webhooks/heygen`
///
/// When a webhook secret is configured, unsigned or mis-signed bodies are
/// rejected before they are parsed.
pub async fn heygen_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    if let Some(secret) = state.config.heygen_webhook_secret.as_deref() {
        let signature = headers
            .get(HEYGEN_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(secret, &body, signature) {
            warn!("Rejected avatar video callback with a bad signature");
            counter!("studio_webhooks_rejected_total", "provider" => "heygen").increment(1);
            return Err(ApiError::unauthorized("Invalid webhook signature"));
        }
    }

    let payload = parse_body("heygen", &body)?;
    debug!(?payload, "Avatar video callback");
    let outcome = state.reconciler.handle_avatar(&payload).await?;
    Ok(Json(outcome.into()))
}
