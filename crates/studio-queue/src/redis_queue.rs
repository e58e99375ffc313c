//! Job queue using Redis Streams.
//!
//! Layout:
//! - `stream_name`: ready and in-flight jobs, read through a consumer group
//! - `delayed_set_name`: jobs waiting for a retry, scored by due time (ms)
//! - `dlq_stream_name`: dead letters with the last error
//! - `{dedup_prefix}:{idempotency_key}`: job id of the queued copy

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::{ConnectionManager, ConnectionManagerConfig, MultiplexedConnection};
use redis::streams::{
    StreamAutoClaimReply, StreamId, StreamRangeReply, StreamReadOptions, StreamReadReply,
};
use redis::{AsyncCommands, AsyncConnectionConfig};
use studio_models::JobId;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::{JobEnvelope, QueueJob};
use crate::queue::{DeadLetter, Delivery, EnqueueReceipt, FailOutcome, JobQueue, QueueConfig};

/// Jobs promoted from the delayed set per consume call.
const PROMOTE_BATCH: isize = 100;

/// Redis Streams job queue.
///
/// Producers open a short-lived multiplexed connection with tight
/// connect/response timeouts so an HTTP request never hangs on the broker.
/// Consumers share a `ConnectionManager` that reconnects on its own and
/// has no response timeout, since `XREADGROUP BLOCK` legitimately waits.
pub struct RedisJobQueue {
    client: redis::Client,
    config: QueueConfig,
    consumer: OnceCell<ConnectionManager>,
}

impl RedisJobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            config,
            consumer: OnceCell::new(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.consumer_conn().await?;

        // Start from the beginning so jobs added before the group existed are delivered
        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    async fn producer_conn(&self) -> QueueResult<MultiplexedConnection> {
        let config = AsyncConnectionConfig::new()
            .set_connection_timeout(self.config.producer_connect_timeout)
            .set_response_timeout(self.config.producer_response_timeout);
        self.client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(QueueError::unreachable)
    }

    async fn consumer_conn(&self) -> QueueResult<ConnectionManager> {
        let conn = self
            .consumer
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(self.config.consumer_reconnect_retries)
                    .set_connection_timeout(self.config.consumer_connect_timeout);
                ConnectionManager::new_with_config(self.client.clone(), config)
                    .await
                    .map_err(QueueError::unreachable)
            })
            .await?;
        Ok(conn.clone())
    }

    fn dedup_key(&self, job: &QueueJob) -> String {
        format!("{}:{}", self.config.dedup_prefix, job.idempotency_key())
    }

    /// Move due retries from the delayed set back into the stream.
    async fn promote_due(&self, conn: &mut ConnectionManager) -> QueueResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        let due: Vec<String> = conn
            .zrangebyscore_limit(
                &self.config.delayed_set_name,
                "-inf",
                now_ms,
                0,
                PROMOTE_BATCH,
            )
            .await?;

        for member in due {
            // Only the consumer that removes the member re-adds it
            let removed: i64 = conn.zrem(&self.config.delayed_set_name, &member).await?;
            if removed == 1 {
                let _: String = conn
                    .xadd(&self.config.stream_name, "*", &[("job", member.as_str())])
                    .await?;
                debug!("Promoted delayed job back into {}", self.config.stream_name);
            }
        }
        Ok(())
    }

    /// Parse stream entries, dead-lettering malformed payloads.
    async fn parse_entries(
        &self,
        conn: &mut ConnectionManager,
        entries: Vec<StreamId>,
    ) -> QueueResult<Vec<Delivery>> {
        let mut deliveries = Vec::new();

        for entry in entries {
            let message_id = entry.id.clone();
            let raw: Option<String> = entry.get("job");

            match raw.as_deref().map(serde_json::from_str::<JobEnvelope>) {
                Some(Ok(envelope)) => {
                    debug!("Consumed job {} from stream", envelope.job_id);
                    deliveries.push(Delivery {
                        message_id,
                        envelope,
                    });
                }
                Some(Err(e)) => {
                    warn!("Failed to parse job payload {}: {}", message_id, e);
                    self.move_to_dlq(
                        conn,
                        &message_id,
                        raw.as_deref().unwrap_or_default(),
                        &format!("malformed payload: {}", e),
                        1,
                        None,
                    )
                    .await?;
                }
                None => {
                    warn!("Stream entry {} has no job field", message_id);
                    self.ack_message(conn, &message_id, None).await?;
                }
            }
        }

        Ok(deliveries)
    }

    async fn ack_message(
        &self,
        conn: &mut ConnectionManager,
        message_id: &str,
        dedup_key: Option<&str>,
    ) -> QueueResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .ignore()
            .cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .ignore();
        if let Some(key) = dedup_key {
            pipe.cmd("DEL").arg(key).ignore();
        }
        pipe.query_async::<()>(conn).await?;
        Ok(())
    }

    async fn move_to_dlq(
        &self,
        conn: &mut ConnectionManager,
        message_id: &str,
        payload: &str,
        error: &str,
        attempts: u32,
        dedup_key: Option<&str>,
    ) -> QueueResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(payload)
            .arg("error")
            .arg(error)
            .arg("attempts")
            .arg(attempts)
            .arg("original_id")
            .arg(message_id)
            .ignore()
            .cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .ignore()
            .cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .ignore();
        if let Some(key) = dedup_key {
            pipe.cmd("DEL").arg(key).ignore();
        }
        pipe.query_async::<()>(conn).await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: QueueJob) -> QueueResult<EnqueueReceipt> {
        let mut conn = self.producer_conn().await?;
        let dedup_key = self.dedup_key(&job);
        let envelope = JobEnvelope::new(job);

        // Claim the idempotency key; losing means an identical job is queued
        let claimed: Option<String> = redis::cmd("SET")
            .arg(&dedup_key)
            .arg(envelope.job_id.as_str())
            .arg("NX")
            .arg("EX")
            .arg(self.config.dedup_ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        if claimed.is_none() {
            let existing: Option<String> = conn.get(&dedup_key).await?;
            if let Some(existing) = existing {
                debug!("Duplicate job {} deduplicated to {}", dedup_key, existing);
                return Ok(EnqueueReceipt {
                    job_id: JobId::from_string(existing),
                    deduplicated: true,
                });
            }
        }

        let payload = serde_json::to_string(&envelope)?;
        let added: Result<String, redis::RedisError> = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await;

        match added {
            Ok(message_id) => {
                info!(
                    "Enqueued {} job {} with message ID {}",
                    envelope.job.job_type(),
                    envelope.job_id,
                    message_id
                );
                Ok(EnqueueReceipt {
                    job_id: envelope.job_id,
                    deduplicated: false,
                })
            }
            Err(e) => {
                // Release the key so a later attempt is not deduplicated against nothing
                let _: Result<(), redis::RedisError> = conn.del(&dedup_key).await;
                Err(QueueError::publish(e))
            }
        }
    }

    async fn consume(&self, consumer: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.consumer_conn().await?;
        self.promote_due(&mut conn).await?;

        let options = StreamReadOptions::default()
            .group(&self.config.consumer_group, consumer)
            .count(max)
            .block(self.config.block_timeout.as_millis() as usize);

        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.config.stream_name], &[">"], &options)
            .await?;

        let entries: Vec<StreamId> = reply
            .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect())
            .unwrap_or_default();

        self.parse_entries(&mut conn, entries).await
    }

    async fn reclaim(&self, consumer: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.consumer_conn().await?;

        let reply: StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg(self.config.visibility_timeout.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(max)
            .query_async(&mut conn)
            .await?;

        let deliveries = self.parse_entries(&mut conn, reply.claimed).await?;
        for delivery in &deliveries {
            info!(
                "Claimed pending job {} ({})",
                delivery.job_id(),
                delivery.message_id
            );
        }
        Ok(deliveries)
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let mut conn = self.consumer_conn().await?;
        let dedup_key = self.dedup_key(delivery.job());
        self.ack_message(&mut conn, &delivery.message_id, Some(&dedup_key))
            .await?;
        debug!("Acknowledged job: {}", delivery.message_id);
        Ok(())
    }

    async fn fail(&self, delivery: &Delivery, error: &str) -> QueueResult<FailOutcome> {
        let failed = delivery.envelope.attempt + 1;
        let backoff = self.config.backoff;

        if backoff.exhausted(failed) {
            self.dead_letter(delivery, error).await?;
            return Ok(FailOutcome::DeadLettered { attempts: failed });
        }

        let mut conn = self.consumer_conn().await?;
        let delay = backoff.delay(delivery.envelope.attempt);
        let due_ms = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let payload = serde_json::to_string(&delivery.envelope.next_attempt())?;

        redis::pipe()
            .atomic()
            .cmd("ZADD")
            .arg(&self.config.delayed_set_name)
            .arg(due_ms)
            .arg(&payload)
            .ignore()
            .cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(&delivery.message_id)
            .ignore()
            .cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(&delivery.message_id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        debug!(
            "Job {} scheduled for retry {} in {:?}",
            delivery.job_id(),
            failed,
            delay
        );
        Ok(FailOutcome::Retry {
            attempt: failed,
            delay,
        })
    }

    async fn dead_letter(&self, delivery: &Delivery, error: &str) -> QueueResult<()> {
        let mut conn = self.consumer_conn().await?;
        let payload = serde_json::to_string(&delivery.envelope)?;
        let dedup_key = self.dedup_key(delivery.job());
        self.move_to_dlq(
            &mut conn,
            &delivery.message_id,
            &payload,
            error,
            delivery.attempt_number(),
            Some(&dedup_key),
        )
        .await?;
        warn!("Moved job {} to DLQ: {}", delivery.job_id(), error);
        Ok(())
    }

    async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.producer_conn().await?;
        let ready: u64 = conn.xlen(&self.config.stream_name).await?;
        let delayed: u64 = conn.zcard(&self.config.delayed_set_name).await?;
        Ok(ready + delayed)
    }

    async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.producer_conn().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    async fn dead_letters(&self, limit: usize) -> QueueResult<Vec<DeadLetter>> {
        let mut conn = self.producer_conn().await?;
        let reply: StreamRangeReply = conn
            .xrevrange_count(&self.config.dlq_stream_name, "+", "-", limit)
            .await?;

        Ok(reply
            .ids
            .into_iter()
            .map(|entry| {
                let envelope = entry
                    .get::<String>("job")
                    .and_then(|raw| serde_json::from_str(&raw).ok());
                DeadLetter {
                    message_id: entry.id.clone(),
                    envelope,
                    error: entry.get("error").unwrap_or_default(),
                    attempts: entry.get("attempts").unwrap_or(0),
                }
            })
            .collect())
    }

    async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.producer_conn().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::Backoff;
    use crate::job::StandaloneVideoJob;
    use std::time::Duration;
    use studio_models::{OrganizationId, StandaloneVideoId};

    fn test_config() -> QueueConfig {
        let suffix = uuid_suffix();
        QueueConfig {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: format!("test:{}:jobs", suffix),
            consumer_group: format!("test:{}:workers", suffix),
            dlq_stream_name: format!("test:{}:dlq", suffix),
            delayed_set_name: format!("test:{}:delayed", suffix),
            dedup_prefix: format!("test:{}:dedup", suffix),
            backoff: Backoff::new(Duration::from_millis(10), Duration::from_millis(50), 2),
            block_timeout: Duration::from_millis(100),
            ..QueueConfig::default()
        }
    }

    fn uuid_suffix() -> String {
        JobId::new().as_str()[..8].to_string()
    }

    #[test]
    fn test_producer_profile_fails_fast_by_default() {
        let config = QueueConfig::default();
        assert!(config.producer_response_timeout <= Duration::from_secs(2));
        assert!(config.consumer_connect_timeout > config.producer_connect_timeout);
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_redis_roundtrip_retry_and_dlq() {
        let queue = RedisJobQueue::new(test_config()).unwrap();
        queue.init().await.unwrap();

        let job = QueueJob::GenerateStandaloneVideo(StandaloneVideoJob {
            standalone_video_id: StandaloneVideoId::new(),
            organization_id: OrganizationId::from("org"),
        });
        let first = queue.enqueue(job.clone()).await.unwrap();
        let dup = queue.enqueue(job).await.unwrap();
        assert!(dup.deduplicated);
        assert_eq!(first.job_id, dup.job_id);

        let delivery = queue.consume("w1", 10).await.unwrap().remove(0);
        assert!(matches!(
            queue.fail(&delivery, "boom").await.unwrap(),
            FailOutcome::Retry { attempt: 1, .. }
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let retried = queue.consume("w1", 10).await.unwrap().remove(0);
        assert_eq!(retried.attempt_number(), 2);
        assert_eq!(
            queue.fail(&retried, "boom again").await.unwrap(),
            FailOutcome::DeadLettered { attempts: 2 }
        );
        assert_eq!(queue.dlq_len().await.unwrap(), 1);
        assert_eq!(queue.dead_letters(5).await.unwrap()[0].error, "boom again");
    }
}
