//! Generation pipeline orchestration.
//!
//! This crate ties the pure state machine in `studio-models` to persistence,
//! the job queue and provider callbacks:
//!
//! - [`OutputService`] applies lifecycle events with conditional writes and
//!   runs the resulting effects
//! - [`RollupService`] keeps submission status in step with its outputs
//! - [`Reconciler`] turns provider webhooks into lifecycle events
//! - [`PostProcessor`] composites bumpers and music onto finished renders
//! - [`CompletionService`] finalizes a render into an artifact
//! - [`Reaper`] fails rows whose provider never called back
//!
//! Everything receives its collaborators through an explicit
//! [`PipelineContext`].

pub mod completion;
pub mod context;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod postprocess;
pub mod reaper;
pub mod reconciler;
pub mod rollup;
pub mod standalone;
pub mod submission;

pub use completion::CompletionService;
pub use context::{PipelineContext, PipelineSettings, Providers};
pub use entity::Entity;
pub use error::{PipelineError, PipelineResult};
pub use lifecycle::{ApplyOutcome, OutputService};
pub use postprocess::PostProcessor;
pub use reaper::{Reaper, ReaperConfig};
pub use reconciler::{
    verify_signature, AvatarCallback, CallbackOutcome, CaptionCallback, LookupStrategy,
    Reconciler, ReconcileOutcome, StandaloneVideoLookup, VideoOutputLookup,
};
pub use rollup::RollupService;
pub use standalone::{NewStandaloneVideo, StandaloneService};
pub use submission::{NewSubmission, SubmissionService, SubmissionView};
