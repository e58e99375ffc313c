//! Structured job logging.

use tracing::{error, info, warn, Span};
use studio_models::JobId;

/// Logs job lifecycle events with the job id and type attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    job_type: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, job_type: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_type: job_type.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            job_type = %self.job_type,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    /// Span that handler logs nest under.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            job_type = %self.job_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_fields() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "generate-quiz");

        assert_eq!(logger.job_id(), job_id.to_string());
        assert_eq!(logger.job_type(), "generate-quiz");
    }
}
