//! Generation worker.
//!
//! This crate provides:
//! - A job executor with a fixed number of worker slots
//! - Retry, dead-letter and entity-failure handling for every job
//! - One handler per queue job type
//! - Structured per-job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod logging;
pub mod prompts;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use handlers::JobHandlers;
pub use logging::JobLogger;
