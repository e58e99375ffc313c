//! Media tooling for post-processing.
//!
//! This crate provides:
//! - An FFmpeg command builder and runner
//! - FFprobe helpers
//! - Composite planning (bumpers, main video, background music)
//! - Streaming downloads of remote media
//! - The `Compositor` seam used by the post-processing pipeline

pub mod command;
pub mod composite;
pub mod compositor;
pub mod download;
pub mod error;
pub mod probe;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use composite::{BumperInput, CompositePlan, MusicInput, Segment};
pub use compositor::{
    BumperSource, CompositeOutput, CompositeSpec, Compositor, CompositorConfig, FfmpegCompositor,
    MusicSource,
};
pub use download::{download_to, extension_from_url};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
