//! FFprobe helpers.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// What compositing needs to know about an input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds (0 when the container does not report one)
    pub duration_secs: f64,
    pub has_video: bool,
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
}

/// Probe a media file for duration and stream layout.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::ToolMissing("ffprobe"))?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::tool_failed(
            "ffprobe",
            output.status.code(),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let duration_secs = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration_secs,
        has_video: probe.streams.iter().any(|s| s.codec_type == "video"),
        has_audio: probe.streams.iter().any(|s| s.codec_type == "audio"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264"},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"duration": "12.480000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration_secs - 12.48).abs() < 0.001);
        assert!(info.has_video);
        assert!(info.has_audio);
    }

    #[test]
    fn test_silent_clip_without_duration() {
        let json = br#"{"streams": [{"codec_type": "video"}], "format": {}}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration_secs, 0.0);
        assert!(!info.has_audio);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = probe_media("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
