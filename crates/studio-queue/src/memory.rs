//! In-process queue with the same semantics as the Redis queue.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::error::{QueueError, QueueResult};
use crate::job::{JobEnvelope, QueueJob};
use crate::queue::{DeadLetter, Delivery, EnqueueReceipt, FailOutcome, JobQueue};

#[derive(Default)]
struct State {
    next_id: u64,
    ready: VecDeque<(String, JobEnvelope)>,
    in_flight: HashMap<String, JobEnvelope>,
    delayed: Vec<(Instant, JobEnvelope)>,
    dedup: HashMap<String, studio_models::JobId>,
    dead: Vec<DeadLetter>,
}

impl State {
    fn message_id(&mut self) -> String {
        self.next_id += 1;
        format!("{}-0", self.next_id)
    }

    fn promote_due(&mut self, now: Instant) {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.delayed.drain(..).partition(|(at, _)| *at <= now);
        self.delayed = waiting;
        for (_, envelope) in due {
            let id = self.message_id();
            self.ready.push_back((id, envelope));
        }
    }

    fn finish(&mut self, delivery: &Delivery) -> QueueResult<JobEnvelope> {
        let envelope = self
            .in_flight
            .remove(&delivery.message_id)
            .ok_or_else(|| QueueError::UnknownDelivery(delivery.message_id.clone()))?;
        Ok(envelope)
    }
}

/// Queue held in memory, used by tests and the single-process dev mode.
///
/// Delays use tokio's clock, so tests can advance time with
/// `tokio::time::pause`/`advance`.
pub struct MemoryJobQueue {
    state: Mutex<State>,
    backoff: Backoff,
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

impl MemoryJobQueue {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: Mutex::new(State::default()),
            backoff,
        }
    }

    /// Jobs ready or waiting for a retry, in queue order.
    pub async fn queued_jobs(&self) -> Vec<QueueJob> {
        let state = self.state.lock().await;
        state
            .ready
            .iter()
            .map(|(_, e)| e.job.clone())
            .chain(state.delayed.iter().map(|(_, e)| e.job.clone()))
            .collect()
    }

    /// Jobs of one type currently queued.
    pub async fn queued_of_type(&self, job_type: &str) -> Vec<QueueJob> {
        self.queued_jobs()
            .await
            .into_iter()
            .filter(|j| j.job_type() == job_type)
            .collect()
    }

    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: QueueJob) -> QueueResult<EnqueueReceipt> {
        let mut state = self.state.lock().await;
        let key = job.idempotency_key();

        if let Some(existing) = state.dedup.get(&key) {
            debug!("Duplicate job {} deduplicated to {}", key, existing);
            return Ok(EnqueueReceipt {
                job_id: existing.clone(),
                deduplicated: true,
            });
        }

        let envelope = JobEnvelope::new(job);
        let job_id = envelope.job_id.clone();
        state.dedup.insert(key, job_id.clone());
        let message_id = state.message_id();
        info!(
            "Enqueued {} job {} with message ID {}",
            envelope.job.job_type(),
            job_id,
            message_id
        );
        state.ready.push_back((message_id, envelope));

        Ok(EnqueueReceipt {
            job_id,
            deduplicated: false,
        })
    }

    async fn consume(&self, _consumer: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        let mut state = self.state.lock().await;
        state.promote_due(Instant::now());

        let mut deliveries = Vec::new();
        while deliveries.len() < max {
            let Some((message_id, envelope)) = state.ready.pop_front() else {
                break;
            };
            state.in_flight.insert(message_id.clone(), envelope.clone());
            deliveries.push(Delivery {
                message_id,
                envelope,
            });
        }
        Ok(deliveries)
    }

    async fn reclaim(&self, _consumer: &str, _max: usize) -> QueueResult<Vec<Delivery>> {
        // A single process cannot crash and leave its own deliveries behind.
        Ok(Vec::new())
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        let envelope = state.finish(delivery)?;
        state.dedup.remove(&envelope.job.idempotency_key());
        debug!("Acknowledged job: {}", delivery.message_id);
        Ok(())
    }

    async fn fail(&self, delivery: &Delivery, error: &str) -> QueueResult<FailOutcome> {
        let mut state = self.state.lock().await;
        let envelope = state.finish(delivery)?;
        let failed = envelope.attempt + 1;

        if self.backoff.exhausted(failed) {
            state.dedup.remove(&envelope.job.idempotency_key());
            warn!("Moved job {} to DLQ: {}", envelope.job_id, error);
            state.dead.push(DeadLetter {
                message_id: delivery.message_id.clone(),
                envelope: Some(envelope),
                error: error.to_string(),
                attempts: failed,
            });
            return Ok(FailOutcome::DeadLettered { attempts: failed });
        }

        let delay = self.backoff.delay(envelope.attempt);
        state
            .delayed
            .push((Instant::now() + delay, envelope.next_attempt()));
        Ok(FailOutcome::Retry {
            attempt: failed,
            delay,
        })
    }

    async fn dead_letter(&self, delivery: &Delivery, error: &str) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        let envelope = state.finish(delivery)?;
        state.dedup.remove(&envelope.job.idempotency_key());
        let attempts = envelope.attempt + 1;
        state.dead.push(DeadLetter {
            message_id: delivery.message_id.clone(),
            envelope: Some(envelope),
            error: error.to_string(),
            attempts,
        });
        Ok(())
    }

    async fn len(&self) -> QueueResult<u64> {
        let state = self.state.lock().await;
        Ok((state.ready.len() + state.in_flight.len() + state.delayed.len()) as u64)
    }

    async fn dlq_len(&self) -> QueueResult<u64> {
        Ok(self.state.lock().await.dead.len() as u64)
    }

    async fn dead_letters(&self, limit: usize) -> QueueResult<Vec<DeadLetter>> {
        let state = self.state.lock().await;
        Ok(state.dead.iter().rev().take(limit).cloned().collect())
    }

    async fn ping(&self) -> QueueResult<()> {
        Ok(())
    }
}
