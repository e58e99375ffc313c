//! Application state.

use std::sync::Arc;

use studio_pipeline::{
    OutputService, PipelineContext, Reconciler, StandaloneService, SubmissionService,
};

use crate::auth::JwtVerifier;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub ctx: Arc<PipelineContext>,
    pub jwt: Arc<JwtVerifier>,
    pub submissions: SubmissionService,
    pub standalone: StandaloneService,
    pub outputs: OutputService,
    pub reconciler: Reconciler,
}

impl AppState {
    /// Build the request-side services over an already wired context.
    pub fn new(config: ApiConfig, ctx: Arc<PipelineContext>) -> Self {
        let jwt = Arc::new(JwtVerifier::new(&config.jwt_secret, &config.jwt_audience));
        Self {
            submissions: SubmissionService::new(ctx.clone()),
            standalone: StandaloneService::new(ctx.clone()),
            outputs: OutputService::new(ctx.clone()),
            reconciler: Reconciler::new(ctx.clone()),
            config,
            ctx,
            jwt,
        }
    }
}
