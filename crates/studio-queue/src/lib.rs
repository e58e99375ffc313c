//! Job queue for the generation pipeline.
//!
//! This crate provides:
//! - Typed job payloads with idempotency keys
//! - A `JobQueue` trait with enqueue/consume/ack/fail primitives
//! - A Redis Streams implementation with delayed retries and a DLQ stream
//! - An in-memory implementation with the same semantics

pub mod backoff;
pub mod error;
pub mod job;
pub mod memory;
pub mod queue;
pub mod redis_queue;

pub use backoff::Backoff;
pub use error::{QueueError, QueueResult};
pub use job::{
    ArticleThumbnailJob, CaptionEditingJob, EntityJob, FailureTarget, JobEnvelope, OutputJob,
    PostProcessJob, QueueJob, StandaloneVideoJob, VideoCompletionJob,
};
pub use memory::MemoryJobQueue;
pub use queue::{DeadLetter, Delivery, EnqueueReceipt, FailOutcome, JobQueue, QueueConfig};
pub use redis_queue::RedisJobQueue;
