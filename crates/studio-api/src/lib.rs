//! Axum HTTP API server.
//!
//! This crate provides:
//! - Organization-scoped REST endpoints for articles, submissions,
//!   outputs and standalone videos
//! - Supabase JWT verification
//! - Provider webhook endpoints feeding the reconciler
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
