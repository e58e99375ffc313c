//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Jobs executed concurrently
    pub slots: usize,
    /// Upper bound for a single job run
    pub job_timeout: Duration,
    /// How long shutdown waits for in-flight jobs
    pub shutdown_timeout: Duration,
    /// Pause after an empty poll
    pub poll_interval: Duration,
    /// How often to take over jobs left behind by crashed workers
    pub claim_interval: Duration,
    /// Jobs taken over per claim pass
    pub claim_batch: usize,
    /// Narration voice when the output does not name one
    pub narrator_voice_id: String,
    /// Second podcast speaker when the output does not name one
    pub guest_voice_id: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            slots: 4,
            job_timeout: Duration::from_secs(1800), // 30 minutes
            shutdown_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(250),
            claim_interval: Duration::from_secs(30),
            claim_batch: 5,
            narrator_voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            guest_voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
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
            slots: std::env::var("WORKER_SLOTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.slots),
            job_timeout: secs("WORKER_JOB_TIMEOUT", defaults.job_timeout),
            shutdown_timeout: secs("WORKER_SHUTDOWN_TIMEOUT", defaults.shutdown_timeout),
            poll_interval: std::env::var("WORKER_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            claim_interval: secs("WORKER_CLAIM_INTERVAL_SECS", defaults.claim_interval),
            claim_batch: std::env::var("WORKER_CLAIM_BATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.claim_batch),
            narrator_voice_id: std::env::var("ELEVENLABS_DEFAULT_VOICE")
                .unwrap_or(defaults.narrator_voice_id),
            guest_voice_id: std::env::var("ELEVENLABS_GUEST_VOICE")
                .unwrap_or(defaults.guest_voice_id),
        }
    }
}
