//! Queue contract and configuration.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studio_models::JobId;

use crate::backoff::Backoff;
use crate::error::QueueResult;
use crate::job::{JobEnvelope, QueueJob};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Sorted set holding jobs waiting for their retry time
    pub delayed_set_name: String,
    /// Prefix for idempotency keys
    pub dedup_prefix: String,
    /// Lifetime of an idempotency key if the job is never acknowledged
    pub dedup_ttl: Duration,
    /// Retry policy
    pub backoff: Backoff,
    /// Messages idle this long in another consumer's pending list are reclaimed
    pub visibility_timeout: Duration,
    /// How long a consumer blocks waiting for new messages
    pub block_timeout: Duration,
    /// Producer connect timeout (fail fast)
    pub producer_connect_timeout: Duration,
    /// Producer per-command timeout (fail fast)
    pub producer_response_timeout: Duration,
    /// Consumer connect timeout
    pub consumer_connect_timeout: Duration,
    /// Consumer reconnect attempts before giving up on a command
    pub consumer_reconnect_retries: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "studio:jobs".to_string(),
            consumer_group: "studio:workers".to_string(),
            dlq_stream_name: "studio:dlq".to_string(),
            delayed_set_name: "studio:jobs:delayed".to_string(),
            dedup_prefix: "studio:dedup".to_string(),
            dedup_ttl: Duration::from_secs(6 * 3600),
            backoff: Backoff::default(),
            visibility_timeout: Duration::from_secs(600), // 10 minutes
            block_timeout: Duration::from_secs(5),
            producer_connect_timeout: Duration::from_millis(2000),
            producer_response_timeout: Duration::from_millis(2000),
            consumer_connect_timeout: Duration::from_secs(10),
            consumer_reconnect_retries: 10,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            delayed_set_name: std::env::var("QUEUE_DELAYED_SET")
                .unwrap_or(defaults.delayed_set_name),
            dedup_prefix: defaults.dedup_prefix,
            dedup_ttl: Duration::from_secs(env_u64("QUEUE_DEDUP_TTL_SECS", 6 * 3600)),
            backoff: Backoff::new(
                Duration::from_millis(env_u64("QUEUE_BACKOFF_BASE_MS", 5_000)),
                Duration::from_millis(env_u64("QUEUE_BACKOFF_MAX_MS", 300_000)),
                env_u64("QUEUE_MAX_ATTEMPTS", 3) as u32,
            ),
            visibility_timeout: Duration::from_secs(env_u64("QUEUE_VISIBILITY_TIMEOUT", 600)),
            block_timeout: Duration::from_millis(env_u64("QUEUE_BLOCK_MS", 5_000)),
            producer_connect_timeout: Duration::from_millis(env_u64(
                "QUEUE_PRODUCER_CONNECT_TIMEOUT_MS",
                2_000,
            )),
            producer_response_timeout: Duration::from_millis(env_u64(
                "QUEUE_PRODUCER_RESPONSE_TIMEOUT_MS",
                2_000,
            )),
            consumer_connect_timeout: Duration::from_secs(env_u64(
                "QUEUE_CONSUMER_CONNECT_TIMEOUT_SECS",
                10,
            )),
            consumer_reconnect_retries: env_u64("QUEUE_CONSUMER_RECONNECT_RETRIES", 10) as usize,
        }
    }
}

/// Result of an enqueue call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueReceipt {
    /// Stable job id (the existing one when deduplicated)
    pub job_id: JobId,
    /// True when an identical job was already queued
    pub deduplicated: bool,
}

/// A job handed to a consumer, to be acked or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned message id
    pub message_id: String,
    pub envelope: JobEnvelope,
}

impl Delivery {
    pub fn job(&self) -> &QueueJob {
        &self.envelope.job
    }

    pub fn job_id(&self) -> &JobId {
        &self.envelope.job_id
    }

    /// 1-based number of the attempt this delivery represents.
    pub fn attempt_number(&self) -> u32 {
        self.envelope.attempt + 1
    }
}

/// What happened to a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Scheduled again after `delay`
    Retry { attempt: u32, delay: Duration },
    /// Attempts exhausted; kept in the dead-letter stream
    DeadLettered { attempts: u32 },
}

/// Dead-lettered job kept for operator inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub message_id: String,
    /// Parsed envelope, absent when the original payload was malformed
    pub envelope: Option<JobEnvelope>,
    pub error: String,
    pub attempts: u32,
}

/// At-least-once job queue.
///
/// No FIFO guarantee is made across retries: a retried job re-enters the
/// queue behind whatever was enqueued while it waited.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job, or return the id of an identical job already queued.
    async fn enqueue(&self, job: QueueJob) -> QueueResult<EnqueueReceipt>;

    /// Take up to `max` new jobs for `consumer`.
    async fn consume(&self, consumer: &str, max: usize) -> QueueResult<Vec<Delivery>>;

    /// Take over jobs left unacknowledged by a crashed consumer.
    async fn reclaim(&self, consumer: &str, max: usize) -> QueueResult<Vec<Delivery>>;

    /// Remove a successfully handled job.
    async fn ack(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Schedule a retry with backoff, or dead-letter when attempts are spent.
    async fn fail(&self, delivery: &Delivery, error: &str) -> QueueResult<FailOutcome>;

    /// Dead-letter immediately, regardless of remaining attempts.
    async fn dead_letter(&self, delivery: &Delivery, error: &str) -> QueueResult<()>;

    /// Jobs waiting or in flight.
    async fn len(&self) -> QueueResult<u64>;

    async fn dlq_len(&self) -> QueueResult<u64>;

    /// Most recent dead letters first.
    async fn dead_letters(&self, limit: usize) -> QueueResult<Vec<DeadLetter>>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> QueueResult<()>;
}
