//! Composite planning: bumpers around a main video, optionally under music.
//!
//! Every segment is normalized to the same frame size, frame rate, and audio
//! layout before `concat`, so inputs from different sources can be joined.
//! Music is looped and mixed under the joined audio for the length of the
//! joined video.

use std::path::{Path, PathBuf};

use crate::command::FfmpegCommand;

const SAMPLE_RATE: u32 = 44_100;

/// One piece of the final timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Still image shown for a fixed time, with silence underneath.
    Image { path: PathBuf, duration_secs: f64 },
    /// Video clip; silent clips get generated silence.
    Video {
        path: PathBuf,
        duration_secs: f64,
        has_audio: bool,
    },
}

impl Segment {
    fn path(&self) -> &Path {
        match self {
            Segment::Image { path, .. } | Segment::Video { path, .. } => path,
        }
    }

    fn duration_secs(&self) -> f64 {
        match self {
            Segment::Image { duration_secs, .. } | Segment::Video { duration_secs, .. } => {
                *duration_secs
            }
        }
    }

    fn has_audio(&self) -> bool {
        matches!(self, Segment::Video { has_audio: true, .. })
    }
}

/// Bumpers are ordinary segments; the alias documents intent at call sites.
pub type BumperInput = Segment;

/// Background track mixed under the whole timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicInput {
    pub path: PathBuf,
    /// Linear gain applied to the track, 0.0..=1.0
    pub volume: f64,
}

/// Fully resolved local inputs for one composite render.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositePlan {
    pub start: Option<BumperInput>,
    pub main: Segment,
    pub end: Option<BumperInput>,
    pub music: Option<MusicInput>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl CompositePlan {
    /// Plan for a main video with nothing added yet.
    pub fn new(main: Segment) -> Self {
        Self {
            start: None,
            main,
            end: None,
            music: None,
            width: 1080,
            height: 1920,
            fps: 30,
        }
    }

    pub fn with_start(mut self, bumper: BumperInput) -> Self {
        self.start = Some(bumper);
        self
    }

    pub fn with_end(mut self, bumper: BumperInput) -> Self {
        self.end = Some(bumper);
        self
    }

    pub fn with_music(mut self, music: MusicInput) -> Self {
        self.music = Some(music);
        self
    }

    pub fn with_frame(mut self, width: u32, height: u32, fps: u32) -> Self {
        self.width = width;
        self.height = height;
        self.fps = fps;
        self
    }

    /// Nothing to add: the main video can be uploaded as-is.
    pub fn is_passthrough(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.music.is_none()
    }

    fn segments(&self) -> Vec<&Segment> {
        self.start
            .iter()
            .chain(std::iter::once(&self.main))
            .chain(self.end.iter())
            .collect()
    }

    /// Build the FFmpeg invocation rendering this plan into `output`.
    pub fn to_command(&self, output: impl AsRef<Path>) -> FfmpegCommand {
        let segments = self.segments();
        let mut cmd = FfmpegCommand::new(output);
        let mut filters = Vec::new();
        let mut concat_inputs = String::new();
        let (w, h, fps) = (self.width, self.height, self.fps);

        for (i, segment) in segments.iter().enumerate() {
            cmd = match segment {
                Segment::Image { duration_secs, .. } => cmd.input_with(
                    [
                        "-loop".to_string(),
                        "1".to_string(),
                        "-framerate".to_string(),
                        fps.to_string(),
                        "-t".to_string(),
                        format!("{:.3}", duration_secs),
                    ],
                    segment.path(),
                ),
                Segment::Video { .. } => cmd.input(segment.path()),
            };

            filters.push(format!(
                "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
                 pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[v{i}]"
            ));

            if segment.has_audio() {
                filters.push(format!(
                    "[{i}:a]aformat=sample_rates={SAMPLE_RATE}:channel_layouts=stereo[a{i}]"
                ));
            } else {
                filters.push(format!(
                    "anullsrc=r={SAMPLE_RATE}:cl=stereo,atrim=duration={:.3}[a{i}]",
                    segment.duration_secs()
                ));
            }

            concat_inputs.push_str(&format!("[v{i}][a{i}]"));
        }

        filters.push(format!(
            "{concat_inputs}concat=n={}:v=1:a=1[vcat][acat]",
            segments.len()
        ));

        let audio_label = match &self.music {
            Some(music) => {
                let idx = segments.len();
                cmd = cmd.input_with(["-stream_loop", "-1"], &music.path);
                filters.push(format!(
                    "[{idx}:a]volume={:.2},aformat=sample_rates={SAMPLE_RATE}:channel_layouts=stereo[bg]",
                    music.volume.clamp(0.0, 1.0)
                ));
                filters.push(
                    "[acat][bg]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]"
                        .to_string(),
                );
                "[aout]"
            }
            None => "[acat]",
        };

        cmd.filter_complex(filters.join(";"))
            .map("[vcat]")
            .map(audio_label)
            .video_codec("libx264")
            .preset("veryfast")
            .crf(20)
            .audio_codec("aac")
            .audio_bitrate("192k")
            .faststart()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_video() -> Segment {
        Segment::Video {
            path: PathBuf::from("/w/main.mp4"),
            duration_secs: 42.0,
            has_audio: true,
        }
    }

    fn filter_of(cmd: &FfmpegCommand) -> String {
        let args = cmd.build_args();
        let idx = args.iter().position(|a| a == "-filter_complex").unwrap();
        args[idx + 1].clone()
    }

    #[test]
    fn test_passthrough_when_nothing_added() {
        assert!(CompositePlan::new(main_video()).is_passthrough());
        assert!(!CompositePlan::new(main_video())
            .with_music(MusicInput {
                path: "/w/music.mp3".into(),
                volume: 0.15
            })
            .is_passthrough());
    }

    #[test]
    fn test_image_bumper_is_looped_for_its_duration() {
        let plan = CompositePlan::new(main_video()).with_start(Segment::Image {
            path: "/w/start.png".into(),
            duration_secs: 3.0,
        });
        let cmd = plan.to_command("/w/out.mp4");
        let args = cmd.build_args();

        let first_input = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(
            &args[first_input - 6..=first_input + 1],
            ["-loop", "1", "-framerate", "30", "-t", "3.000", "-i", "/w/start.png"]
        );

        let filter = filter_of(&cmd);
        assert!(filter.contains("anullsrc=r=44100:cl=stereo,atrim=duration=3.000[a0]"));
        assert!(filter.contains("[1:a]aformat=sample_rates=44100:channel_layouts=stereo[a1]"));
        assert!(filter.contains("[v0][a0][v1][a1]concat=n=2:v=1:a=1[vcat][acat]"));
        assert!(args.ends_with(&["/w/out.mp4".to_string()]));
    }

    #[test]
    fn test_full_plan_orders_segments_and_mixes_music() {
        let plan = CompositePlan::new(main_video())
            .with_start(Segment::Video {
                path: "/w/start.mp4".into(),
                duration_secs: 2.5,
                has_audio: false,
            })
            .with_end(Segment::Image {
                path: "/w/end.jpg".into(),
                duration_secs: 4.0,
            })
            .with_music(MusicInput {
                path: "/w/music.mp3".into(),
                volume: 0.2,
            });
        let cmd = plan.to_command("/w/out.mp4");
        assert_eq!(cmd.input_count(), 4);

        let args = cmd.build_args();
        let inputs: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-i")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(
            inputs,
            ["/w/start.mp4", "/w/main.mp4", "/w/end.jpg", "/w/music.mp3"]
        );

        let filter = filter_of(&cmd);
        assert!(filter.contains("atrim=duration=2.500[a0]"));
        assert!(filter.contains("concat=n=3:v=1:a=1[vcat][acat]"));
        assert!(filter.contains("[3:a]volume=0.20"));
        assert!(filter.contains("[acat][bg]amix=inputs=2:duration=first"));

        let map_targets: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-map")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(map_targets, ["[vcat]", "[aout]"]);
    }

    #[test]
    fn test_music_input_loops_forever() {
        let plan = CompositePlan::new(main_video()).with_music(MusicInput {
            path: "/w/music.mp3".into(),
            volume: 3.0,
        });
        let cmd = plan.to_command("/w/out.mp4");
        let args = cmd.build_args();
        let music = args.iter().position(|a| a == "/w/music.mp3").unwrap();
        assert_eq!(&args[music - 3..music], ["-stream_loop", "-1", "-i"]);
        // Volume is clamped to unity.
        assert!(filter_of(&cmd).contains("volume=1.00"));
    }

    #[test]
    fn test_frame_size_is_applied_to_every_segment() {
        let plan = CompositePlan::new(main_video())
            .with_end(Segment::Image {
                path: "/w/end.png".into(),
                duration_secs: 2.0,
            })
            .with_frame(1920, 1080, 25);
        let filter = filter_of(&plan.to_command("/w/out.mp4"));
        assert_eq!(filter.matches("scale=1920:1080").count(), 2);
        assert_eq!(filter.matches("fps=25").count(), 2);
    }
}
