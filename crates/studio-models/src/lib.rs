//! Shared data models for the studio backend.
//!
//! This crate provides Serde-serializable types for:
//! - Organizations, articles and reusable media assets
//! - Submissions and their generated outputs
//! - Standalone videos
//! - The generation state machine shared by every output kind
//! - Submission rollup status

pub mod article;
pub mod asset;
pub mod config;
pub mod id;
pub mod lifecycle;
pub mod organization;
pub mod output;
pub mod rollup;
pub mod standalone;
pub mod status;
pub mod submission;

// Re-export common types
pub use article::Article;
pub use asset::{BackgroundMusic, BumperMedia, VideoBumper};
pub use config::GenerationConfig;
pub use id::{
    ArticleId, AssetId, JobId, OrganizationId, OutputId, StandaloneVideoId, SubmissionId,
};
pub use lifecycle::{
    plan, Effect, GenerationState, MediaStage, OutputEvent, ProviderHandle, ProviderHandles,
    Transition, TransitionError,
};
pub use organization::{Membership, Organization, Role};
pub use output::{Artifact, EntityRef, Output, OutputKind};
pub use rollup::{compute as compute_rollup, RequestedOutputs};
pub use standalone::StandaloneVideo;
pub use status::{OutputStatus, SubmissionStatus};
pub use submission::Submission;
