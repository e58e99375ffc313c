//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Lines of stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One `-i` input together with the options that precede it.
#[derive(Debug, Clone, PartialEq)]
struct Input {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a command writing to `output`. Add inputs with [`Self::input`].
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add a plain input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with(Vec::<String>::new(), path)
    }

    /// Add an input preceded by its own options (e.g. `-loop 1 -t 3`).
    pub fn input_with<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(Input {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, label: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(label)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Move the moov atom to the front so players can start before the download ends.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with a wall-clock limit.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill FFmpeg if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run an FFmpeg command, returning the tail of stderr on failure.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::ToolMissing("ffmpeg"))?;

        if cmd.input_count() == 0 {
            return Err(MediaError::invalid_input("FFmpeg command has no inputs"));
        }

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut tail: Vec<String> = Vec::new();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
                tail.join("\n")
            })
        });

        let status = self.wait(&mut child).await;

        let stderr = match stderr_task {
            Some(task) => task.await.ok().filter(|s| !s.is_empty()),
            None => None,
        };

        let status = status?;
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::tool_failed("ffmpeg", status.code(), stderr))
        }
    }

    async fn wait(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!(
                    "FFmpeg timed out after {} seconds, killing process",
                    timeout.as_secs()
                );
                let _ = child.kill().await;
                Err(MediaError::Timeout(timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_orders_inputs_and_outputs() {
        let cmd = FfmpegCommand::new("/tmp/out.mp4")
            .input_with(["-loop", "1", "-t", "3"], "/tmp/intro.png")
            .input("/tmp/main.mp4")
            .filter_complex("[0:v][1:v]concat=n=2:v=1:a=0[v]")
            .map("[v]")
            .video_codec("libx264")
            .crf(20);

        let args = cmd.build_args();
        assert_eq!(
            args,
            vec![
                "-y",
                "-v",
                "error",
                "-loop",
                "1",
                "-t",
                "3",
                "-i",
                "/tmp/intro.png",
                "-i",
                "/tmp/main.mp4",
                "-filter_complex",
                "[0:v][1:v]concat=n=2:v=1:a=0[v]",
                "-map",
                "[v]",
                "-c:v",
                "libx264",
                "-crf",
                "20",
                "/tmp/out.mp4",
            ]
        );
        assert_eq!(cmd.input_count(), 2);
    }

    #[test]
    fn test_log_level_override() {
        let args = FfmpegCommand::new("out.mp4")
            .input("in.mp4")
            .log_level("warning")
            .build_args();
        assert_eq!(&args[1..3], ["-v", "warning"]);
    }

    #[tokio::test]
    async fn test_command_without_inputs_is_rejected() {
        let runner = FfmpegRunner::new();
        let result = runner.run(&FfmpegCommand::new("out.mp4")).await;
        assert!(matches!(
            result,
            Err(MediaError::InvalidInput(_)) | Err(MediaError::ToolMissing(_))
        ));
    }
}
