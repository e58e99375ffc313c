//! Liveness and readiness probes.

use std::future::Future;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::metrics;
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeState {
    Ok,
    Error,
}

#[derive(Serialize)]
pub struct Probe {
    pub status: ProbeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl Probe {
    async fn run<E, F>(check: F) -> Self
    where
        E: std::fmt::Display,
        F: Future<Output = Result<(), E>>,
    {
        let started = Instant::now();
        match check.await {
            Ok(()) => Self {
                status: ProbeState::Ok,
                error: None,
                latency_ms: Some(started.elapsed().as_millis() as u64),
            },
            Err(e) => Self {
                status: ProbeState::Error,
                error: Some(e.to_string()),
                latency_ms: None,
            },
        }
    }

    fn passed(&self) -> bool {
        self.status == ProbeState::Ok
    }
}

#[derive(Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub checks: ReadinessChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<u64>,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub store: Probe,
    pub queue: Probe,
    pub storage: Probe,
}

/// Store, queue and object storage must all answer. Refreshes the queue
/// gauges as a side effect.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let ctx = &state.ctx;
    let store = Probe::run(ctx.store.ping()).await;
    let queue = Probe::run(ctx.queue.ping()).await;
    let storage = Probe::run(ctx.storage.ping()).await;

    let mut queue_depth = None;
    if queue.passed() {
        if let Ok(len) = ctx.queue.len().await {
            metrics::set_queue_length(len);
            queue_depth = Some(len);
        }
        if let Ok(len) = ctx.queue.dlq_len().await {
            metrics::set_dlq_length(len);
        }
    }

    let healthy = store.passed() && queue.passed() && storage.passed();
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = Readiness {
        status: if healthy { "ready" } else { "degraded" },
        checks: ReadinessChecks {
            store,
            queue,
            storage,
        },
        queue_depth,
    };
    (code, Json(body))
}
