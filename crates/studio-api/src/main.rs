//! studio-server: HTTP API plus an embedded job executor and reaper.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use studio_api::{create_router, metrics, ApiConfig, AppState};
use studio_media::{CompositorConfig, FfmpegCompositor};
use studio_models::{Membership, Organization, Role};
use studio_pipeline::{PipelineContext, PipelineSettings, Providers, Reaper, ReaperConfig};
use studio_providers::{ElevenLabsClient, HeyGenClient, OpenAiClient, SubmagicClient};
use studio_queue::{Backoff, JobQueue, MemoryJobQueue, RedisJobQueue};
use studio_storage::{MemoryObjectStore, ObjectStore, R2Client};
use studio_store::{MemoryStore, Store};
use studio_worker::{JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    init_tracing()?;
    info!("Starting studio-server");

    let config = ApiConfig::from_env();
    info!(
        "API config: host={}, port={}, production={}",
        config.host,
        config.port,
        config.is_production()
    );
    if config.jwt_secret.is_empty() {
        warn!("SUPABASE_JWT_SECRET is not set; every authenticated request will be rejected");
    }

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);
    let metrics_handle = if metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Metrics disabled, recorder install failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    let ctx = Arc::new(build_context().await?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let executor = JobExecutor::new(WorkerConfig::from_env(), ctx.clone());
    let executor_shutdown = shutdown_rx.clone();
    let executor_task = tokio::spawn(async move {
        if let Err(e) = executor.run(executor_shutdown).await {
            error!("Job executor stopped with error: {}", e);
        }
    });

    let reaper = Reaper::new(ctx.clone(), ReaperConfig::from_env());
    let reaper_shutdown = shutdown_rx.clone();
    let reaper_task = tokio::spawn(async move {
        if let Err(e) = reaper.run(reaper_shutdown).await {
            error!("Reaper stopped with error: {}", e);
        }
    });

    let app = create_router(AppState::new(config.clone(), ctx), metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx))
    .await
    .context("HTTP server failed")?;

    // The executor waits for in-flight jobs up to its own shutdown timeout
    let _ = executor_task.await;
    let _ = reaper_task.await;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("studio=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
    Ok(())
}

/// Wire providers, storage, queue and persistence from the environment.
///
/// `STORAGE_BACKEND=memory` and `QUEUE_BACKEND=memory` run without R2 or
/// Redis, for local development.
async fn build_context() -> anyhow::Result<PipelineContext> {
    let openai = Arc::new(OpenAiClient::from_env().context("OpenAI client")?);
    let providers = Providers {
        text: openai.clone(),
        speech: Arc::new(ElevenLabsClient::from_env().context("ElevenLabs client")?),
        avatar: Arc::new(HeyGenClient::from_env().context("HeyGen client")?),
        captions: Arc::new(SubmagicClient::from_env().context("Submagic client")?),
        transcriber: openai.clone(),
        images: openai,
    };

    let storage: Arc<dyn ObjectStore> = match backend("STORAGE_BACKEND").as_str() {
        "memory" => {
            warn!("Using in-memory object storage; media is lost on restart");
            Arc::new(MemoryObjectStore::default())
        }
        _ => Arc::new(R2Client::from_env().context("R2 client")?),
    };

    let queue: Arc<dyn JobQueue> = match backend("QUEUE_BACKEND").as_str() {
        "memory" => {
            warn!("Using in-memory job queue; jobs are lost on restart");
            Arc::new(MemoryJobQueue::new(Backoff::default()))
        }
        _ => {
            let queue = RedisJobQueue::from_env().context("Redis queue")?;
            queue.init().await.context("Redis queue init")?;
            Arc::new(queue)
        }
    };

    let http = reqwest::Client::builder()
        .build()
        .context("HTTP client for media downloads")?;
    let compositor = Arc::new(FfmpegCompositor::new(http, CompositorConfig::from_env()));

    // A database-backed Store plugs in here; rows live in process memory
    let store = Arc::new(MemoryStore::new());
    bootstrap_organization(store.as_ref()).await?;

    Ok(PipelineContext::new(store, queue, storage, compositor, providers)
        .with_settings(PipelineSettings::from_env()))
}

/// Seed one organization and its owner from `BOOTSTRAP_ORG_SLUG` and
/// `BOOTSTRAP_OWNER_ID`, so a fresh in-memory store is usable.
async fn bootstrap_organization(store: &dyn Store) -> anyhow::Result<()> {
    let (Ok(slug), Ok(owner)) = (
        std::env::var("BOOTSTRAP_ORG_SLUG"),
        std::env::var("BOOTSTRAP_OWNER_ID"),
    ) else {
        return Ok(());
    };
    let name = std::env::var("BOOTSTRAP_ORG_NAME").unwrap_or_else(|_| slug.clone());
    let org = store
        .create_organization(Organization::new(slug, name))
        .await
        .context("Bootstrap organization")?;
    store
        .add_membership(Membership::new(org.id.clone(), owner, Role::Owner))
        .await
        .context("Bootstrap owner membership")?;
    info!(organization = %org.slug, "Bootstrapped organization");
    Ok(())
}

fn backend(var: &str) -> String {
    std::env::var(var).unwrap_or_default().to_lowercase()
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for CTRL+C: {}", e);
    }
    info!("Received shutdown signal");
    let _ = shutdown_tx.send(true);
}
