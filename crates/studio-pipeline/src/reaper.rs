//! Periodic sweep for rows whose provider never called back.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use studio_models::{EntityRef, GenerationState, OutputEvent};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::context::PipelineContext;
use crate::error::PipelineResult;
use crate::lifecycle::OutputService;

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// How long a row may wait on a provider callback
    pub callback_timeout: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            callback_timeout: Duration::from_secs(2 * 60 * 60),
        }
    }
}

impl ReaperConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        Self {
            interval: secs("REAPER_INTERVAL_SECS", defaults.interval),
            callback_timeout: secs("PROVIDER_CALLBACK_TIMEOUT_SECS", defaults.callback_timeout),
        }
    }
}

/// Fails outputs and standalone videos stuck waiting on a provider.
pub struct Reaper {
    ctx: Arc<PipelineContext>,
    outputs: OutputService,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(ctx: Arc<PipelineContext>, config: ReaperConfig) -> Self {
        Self {
            outputs: OutputService::new(ctx.clone()),
            ctx,
            config,
        }
    }

    /// One pass. Returns how many rows were timed out.
    pub async fn sweep(&self, now: DateTime<Utc>) -> PipelineResult<usize> {
        let timeout = chrono::Duration::from_std(self.config.callback_timeout)
            .unwrap_or_else(|_| chrono::Duration::hours(2));
        let cutoff = now - timeout;
        let store = self.ctx.store.as_ref();

        let mut stale: Vec<(EntityRef, GenerationState)> = store
            .outputs_awaiting_since(cutoff)
            .await?
            .into_iter()
            .map(|o| (o.entity_ref(), o.state))
            .collect();
        stale.extend(
            store
                .standalone_awaiting_since(cutoff)
                .await?
                .into_iter()
                .map(|v| (v.entity_ref(), v.state)),
        );

        let mut reaped = 0;
        for (target, state) in stale {
            let waited_secs = state
                .awaiting_provider_since
                .map(|since| (now - since).num_seconds().max(0) as u64)
                .unwrap_or_else(|| self.config.callback_timeout.as_secs());

            match self
                .outputs
                .apply(&target, OutputEvent::TimedOut { waited_secs })
                .await
            {
                Ok(outcome) if outcome.is_applied() => {
                    warn!(entity = %target, waited_secs, "Provider callback timed out");
                    metrics::counter!("studio_reaped_total", "table" => target.table())
                        .increment(1);
                    reaped += 1;
                }
                Ok(_) => {}
                // One bad row must not stop the sweep
                Err(err) => error!(entity = %target, "Failed to time out row: {}", err),
            }
        }

        if reaped > 0 {
            info!("Reaper timed out {} rows", reaped);
        }
        Ok(reaped)
    }

    /// Sweep every `interval` until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!(
            interval_secs = self.config.interval.as_secs(),
            timeout_secs = self.config.callback_timeout.as_secs(),
            "Starting reaper"
        );
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep(Utc::now()).await {
                        error!("Reaper sweep failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Reaper stopping");
                        return Ok(());
                    }
                }
            }
        }
    }
}
