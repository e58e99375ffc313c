//! Job executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use studio_pipeline::{CompletionService, OutputService, PipelineContext};
use studio_queue::{Delivery, FailOutcome, FailureTarget, JobQueue, QueueJob};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::handlers::JobHandlers;
use crate::logging::JobLogger;

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    runner: Arc<JobRunner>,
    job_semaphore: Arc<Semaphore>,
    consumer_name: String,
}

/// Runs one delivery and settles it with the queue.
struct JobRunner {
    queue: Arc<dyn JobQueue>,
    handlers: JobHandlers,
    outputs: OutputService,
    completion: CompletionService,
    job_timeout: Duration,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, ctx: Arc<PipelineContext>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.slots));
        let consumer_name = format!("worker-{}", Uuid::new_v4());
        let runner = Arc::new(JobRunner {
            queue: ctx.queue.clone(),
            handlers: JobHandlers::new(ctx.clone(), config.clone()),
            outputs: OutputService::new(ctx.clone()),
            completion: CompletionService::new(ctx),
            job_timeout: config.job_timeout,
        });

        Self {
            config,
            runner,
            job_semaphore,
            consumer_name,
        }
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Consume jobs until `shutdown` flips to true, then wait for in-flight
    /// jobs up to the configured shutdown timeout.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} slots",
            self.consumer_name, self.config.slots
        );

        let claim_task = self.spawn_claim_task(shutdown.clone());

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "In-flight jobs still running after {:?}; they will be reclaimed by another worker",
                self.config.shutdown_timeout
            );
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Run every ready job inline until the queue has nothing ready.
    ///
    /// Used by tests and one-shot tooling; jobs waiting out a retry delay
    /// are left in place.
    pub async fn drain(&self) -> WorkerResult<usize> {
        let mut executed = 0;
        loop {
            let batch = self
                .runner
                .queue
                .consume(&self.consumer_name, self.config.slots)
                .await?;
            if batch.is_empty() {
                return Ok(executed);
            }
            for delivery in batch {
                self.runner.execute(delivery).await;
                executed += 1;
            }
        }
    }

    /// Take over jobs that a crashed worker left unacknowledged.
    fn spawn_claim_task(&self, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let claim_interval = self.config.claim_interval;
        let claim_batch = self.config.claim_batch;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match runner.queue.reclaim(&consumer_name, claim_batch).await {
                            Ok(deliveries) if !deliveries.is_empty() => {
                                info!("Claimed {} pending jobs", deliveries.len());
                                for delivery in deliveries {
                                    let Ok(permit) = semaphore.clone().acquire_owned().await else {
                                        return;
                                    };
                                    let runner = Arc::clone(&runner);
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        runner.execute(delivery).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Failed to claim pending jobs: {}", e),
                        }
                    }
                }
            }
        })
    }

    /// Consume up to the free slot count and spawn one task per job.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(self.config.poll_interval).await;
            return Ok(());
        }

        let deliveries = self
            .runner
            .queue
            .consume(&self.consumer_name, available)
            .await?;
        if deliveries.is_empty() {
            tokio::time::sleep(self.config.poll_interval).await;
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", deliveries.len());

        for delivery in deliveries {
            let runner = Arc::clone(&self.runner);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                runner.execute(delivery).await;
            });
        }

        Ok(())
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        while self.job_semaphore.available_permits() < self.config.slots {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

impl JobRunner {
    /// Execute a single job with retry and dead-letter handling.
    ///
    /// Never returns an error: every outcome is settled with the queue, and
    /// a job that can no longer succeed fails the row it was working on.
    async fn execute(&self, delivery: Delivery) {
        let job = delivery.job().clone();
        let logger = JobLogger::new(delivery.job_id(), job.job_type());
        let span = logger.span();

        async move {
            logger.log_start(&format!("attempt {}", delivery.attempt_number()));
            let started = Instant::now();

            let result = match tokio::time::timeout(self.job_timeout, self.handlers.handle(&job)).await
            {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Timeout(self.job_timeout.as_secs())),
            };
            histogram!("studio_job_duration_seconds", "job_type" => job.job_type())
                .record(started.elapsed().as_secs_f64());

            match result {
                Ok(()) => {
                    if let Err(e) = self.queue.ack(&delivery).await {
                        logger.log_error(&format!("Failed to ack: {}", e));
                    }
                    counter!("studio_jobs_completed_total", "job_type" => job.job_type())
                        .increment(1);
                    logger.log_completion(&format!("in {:?}", started.elapsed()));
                }
                Err(e) if e.is_retryable() => {
                    logger.log_warning(&format!("Attempt failed: {}", e));
                    match self.queue.fail(&delivery, &e.to_string()).await {
                        Ok(FailOutcome::Retry { attempt, delay }) => {
                            counter!("studio_jobs_retried_total", "job_type" => job.job_type())
                                .increment(1);
                            logger.log_progress(&format!(
                                "Retry scheduled after attempt {} in {:?}",
                                attempt, delay
                            ));
                        }
                        Ok(FailOutcome::DeadLettered { attempts }) => {
                            counter!("studio_jobs_dead_lettered_total", "job_type" => job.job_type())
                                .increment(1);
                            logger.log_error(&format!(
                                "Giving up after {} attempts: {}",
                                attempts, e
                            ));
                            self.fail_target(&job, &e, &logger).await;
                        }
                        // Left unacknowledged; the claim task picks it up again
                        Err(qe) => logger.log_error(&format!("Failed to record failure: {}", qe)),
                    }
                }
                Err(e) => {
                    logger.log_error(&format!("Permanent failure: {}", e));
                    if let Err(qe) = self.queue.dead_letter(&delivery, &e.to_string()).await {
                        logger.log_error(&format!("Failed to dead-letter: {}", qe));
                    }
                    counter!("studio_jobs_dead_lettered_total", "job_type" => job.job_type())
                        .increment(1);
                    self.fail_target(&job, &e, &logger).await;
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Persist FAILED on the row the job was producing.
    async fn fail_target(&self, job: &QueueJob, err: &WorkerError, logger: &JobLogger) {
        let target = match job.failure_target() {
            FailureTarget::Entity(target) => target,
            FailureTarget::ProviderHandle(provider_video_id) => {
                match self.completion.resolve(&provider_video_id).await {
                    Ok(entity) => entity.entity_ref(),
                    Err(e) => {
                        logger.log_warning(&format!(
                            "No row to fail for provider id {}: {}",
                            provider_video_id, e
                        ));
                        return;
                    }
                }
            }
            FailureTarget::None => return,
        };

        match self.outputs.fail(&target, err.user_message()).await {
            Ok(outcome) if outcome.is_applied() => {
                counter!("studio_outputs_failed_total", "table" => target.table()).increment(1);
                logger.log_warning(&format!("{} marked FAILED", target));
            }
            Ok(_) => {}
            Err(e) => logger.log_error(&format!("Could not fail {}: {}", target, e)),
        }
    }
}
