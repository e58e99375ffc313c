//! The compositing seam used by post-processing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use studio_models::BumperMedia;
use tempfile::TempDir;
use tracing::info;

use crate::command::FfmpegRunner;
use crate::composite::{CompositePlan, MusicInput, Segment};
use crate::download::{download_to, extension_from_url};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// Remote bumper to place before or after the main video.
#[derive(Debug, Clone, PartialEq)]
pub struct BumperSource {
    pub media_url: String,
    pub media: BumperMedia,
}

/// Remote music track with its mix level.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicSource {
    pub media_url: String,
    pub volume: f32,
}

/// Everything needed to render one post-processed video.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSpec {
    pub main_url: String,
    pub start: Option<BumperSource>,
    pub end: Option<BumperSource>,
    pub music: Option<MusicSource>,
}

impl CompositeSpec {
    pub fn new(main_url: impl Into<String>) -> Self {
        Self {
            main_url: main_url.into(),
            start: None,
            end: None,
            music: None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.music.is_none()
    }
}

/// A rendered file. The backing directory is removed on drop.
#[derive(Debug)]
pub struct CompositeOutput {
    path: PathBuf,
    _dir: TempDir,
}

impl CompositeOutput {
    pub fn new(dir: TempDir, path: PathBuf) -> Self {
        Self { path, _dir: dir }
    }

    /// Write `bytes` to a fresh temp directory. Handy for test compositors.
    pub fn from_bytes(bytes: &[u8], file_name: &str) -> MediaResult<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(file_name);
        std::fs::write(&path, bytes)?;
        Ok(Self::new(dir, path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Renders bumpers and music around a main video.
#[async_trait]
pub trait Compositor: Send + Sync {
    async fn composite(&self, spec: &CompositeSpec) -> MediaResult<CompositeOutput>;
}

/// Compositor settings.
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// Parent of the per-render scratch directories
    pub work_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Kill FFmpeg after this long
    pub ffmpeg_timeout: Duration,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            width: 1080,
            height: 1920,
            fps: 30,
            ffmpeg_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl CompositorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let parse = |name: &str, default: u32| {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            width: parse("COMPOSITE_WIDTH", defaults.width),
            height: parse("COMPOSITE_HEIGHT", defaults.height),
            fps: parse("COMPOSITE_FPS", defaults.fps),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.ffmpeg_timeout.as_secs()),
            ),
        }
    }
}

/// Downloads inputs into a scratch directory and renders with FFmpeg.
pub struct FfmpegCompositor {
    http: reqwest::Client,
    runner: FfmpegRunner,
    config: CompositorConfig,
}

impl FfmpegCompositor {
    pub fn new(http: reqwest::Client, config: CompositorConfig) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout);
        Self {
            http,
            runner,
            config,
        }
    }

    async fn fetch(&self, dir: &Path, name: &str, url: &str, default_ext: &str) -> MediaResult<PathBuf> {
        let path = dir.join(format!("{}.{}", name, extension_from_url(url, default_ext)));
        download_to(&self.http, url, &path).await?;
        Ok(path)
    }

    async fn segment(&self, path: PathBuf) -> MediaResult<Segment> {
        let info = probe_media(&path).await?;
        if !info.has_video {
            return Err(MediaError::invalid_input(format!(
                "{} has no video stream",
                path.display()
            )));
        }
        Ok(Segment::Video {
            path,
            duration_secs: info.duration_secs,
            has_audio: info.has_audio,
        })
    }

    async fn bumper(&self, dir: &Path, name: &str, source: &BumperSource) -> MediaResult<Segment> {
        match source.media {
            BumperMedia::Image { duration_secs } => {
                if duration_secs <= 0.0 {
                    return Err(MediaError::invalid_input(format!(
                        "Image bumper duration must be positive, got {duration_secs}"
                    )));
                }
                let path = self.fetch(dir, name, &source.media_url, "png").await?;
                Ok(Segment::Image {
                    path,
                    duration_secs,
                })
            }
            BumperMedia::Video => {
                let path = self.fetch(dir, name, &source.media_url, "mp4").await?;
                self.segment(path).await
            }
        }
    }
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    async fn composite(&self, spec: &CompositeSpec) -> MediaResult<CompositeOutput> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix("composite-")
            .tempdir_in(&self.config.work_dir)?;

        let main_path = self.fetch(dir.path(), "main", &spec.main_url, "mp4").await?;
        if spec.is_passthrough() {
            info!("Nothing to composite, passing {} through", spec.main_url);
            return Ok(CompositeOutput::new(dir, main_path));
        }

        let mut plan = CompositePlan::new(self.segment(main_path).await?).with_frame(
            self.config.width,
            self.config.height,
            self.config.fps,
        );
        if let Some(start) = &spec.start {
            plan = plan.with_start(self.bumper(dir.path(), "start", start).await?);
        }
        if let Some(end) = &spec.end {
            plan = plan.with_end(self.bumper(dir.path(), "end", end).await?);
        }
        if let Some(music) = &spec.music {
            let path = self.fetch(dir.path(), "music", &music.media_url, "mp3").await?;
            plan = plan.with_music(MusicInput {
                path,
                volume: f64::from(music.volume),
            });
        }

        let output = dir.path().join("composite.mp4");
        self.runner.run(&plan.to_command(&output)).await?;

        let size = tokio::fs::metadata(&output).await?.len();
        info!(
            "Composited {} (start: {}, end: {}, music: {}) into {} bytes",
            spec.main_url,
            spec.start.is_some(),
            spec.end.is_some(),
            spec.music.is_some(),
            size
        );
        Ok(CompositeOutput::new(dir, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_spec_passthrough() {
        let mut spec = CompositeSpec::new("https://cdn/main.mp4");
        assert!(spec.is_passthrough());
        spec.end = Some(BumperSource {
            media_url: "https://cdn/end.png".into(),
            media: BumperMedia::Image { duration_secs: 2.0 },
        });
        assert!(!spec.is_passthrough());
    }

    #[test]
    fn test_output_from_bytes_is_cleaned_up() {
        let output = CompositeOutput::from_bytes(b"video", "out.mp4").unwrap();
        let path = output.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"video");
        drop(output);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_passthrough_only_downloads_main() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/main.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"main-video".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let work = tempfile::tempdir().unwrap();
        let compositor = FfmpegCompositor::new(
            reqwest::Client::new(),
            CompositorConfig {
                work_dir: work.path().to_path_buf(),
                ..Default::default()
            },
        );
        let output = compositor
            .composite(&CompositeSpec::new(format!("{}/main.mp4", server.uri())))
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(output.path()).await.unwrap(), b"main-video");
        assert!(output.path().starts_with(work.path()));
    }

    #[tokio::test]
    async fn test_image_bumper_requires_positive_duration() {
        let work = tempfile::tempdir().unwrap();
        let compositor = FfmpegCompositor::new(
            reqwest::Client::new(),
            CompositorConfig {
                work_dir: work.path().to_path_buf(),
                ..Default::default()
            },
        );
        let err = compositor
            .bumper(
                work.path(),
                "start",
                &BumperSource {
                    media_url: "https://cdn/start.png".into(),
                    media: BumperMedia::Image { duration_secs: 0.0 },
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }
}
