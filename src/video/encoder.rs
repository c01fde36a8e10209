use std::path::Path;
use std::process::{Command, Stdio};

use tokio::task;
use tracing::{debug, info};

use crate::composition::timeline::{Layer, Timeline, VisualClip, VisualSource};
use crate::config::VideoConfig;
use crate::error::{Result, VideoError};

/// Represents an encoded video output
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub path: String,
    pub duration: f64,
    pub file_size: u64,
}

/// Renders a [`Timeline`] to a video file with a single ffmpeg invocation
pub struct TimelineEncoder {
    config: VideoConfig,
}

impl TimelineEncoder {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    pub fn check_ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub async fn encode<P: AsRef<Path>>(&self, timeline: &Timeline, output_path: P) -> Result<EncodedVideo> {
        let output_path = output_path.as_ref();
        info!(
            "Encoding {} visual and {} audio clips ({:.2}s)",
            timeline.visual_clips.len(),
            timeline.audio_clips.len(),
            timeline.duration()
        );

        if !Self::check_ffmpeg_available() {
            return Err(VideoError::EncodingFailed {
                reason: "FFmpeg not found. Please install FFmpeg.".to_string(),
            }
            .into());
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let args = self.build_args(timeline, output_path);
        debug!("ffmpeg {}", args.join(" "));

        let mut cmd = Command::new("ffmpeg");
        cmd.args(&args);

        let output = task::spawn_blocking(move || cmd.output())
            .await
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("FFmpeg execution failed: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::EncodingFailed {
                reason: format!("FFmpeg failed: {}", stderr),
            }
            .into());
        }

        let metadata = std::fs::metadata(output_path)?;
        let encoded = EncodedVideo {
            path: output_path.display().to_string(),
            duration: timeline.duration(),
            file_size: metadata.len(),
        };

        info!("Video encoding complete: {}MB", encoded.file_size / 1024 / 1024);
        Ok(encoded)
    }

    /// Full ffmpeg argument list: inputs, filter graph, output settings
    pub fn build_args(&self, timeline: &Timeline, output_path: &Path) -> Vec<String> {
        let (width, height) = timeline.canvas;
        let total = timeline.duration();
        let fps = self.config.fps;

        let mut args: Vec<String> = vec!["-hide_banner".into(), "-y".into()];

        args.extend([
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("color=c=black:s={}x{}:r={}:d={:.3}", width, height, fps, total),
        ]);

        for clip in timeline.layered_clips() {
            match &clip.source {
                VisualSource::Image(image) => args.extend([
                    "-loop".to_string(),
                    "1".to_string(),
                    "-framerate".to_string(),
                    fps.to_string(),
                    "-t".to_string(),
                    format!("{:.3}", clip.duration),
                    "-i".to_string(),
                    image.path().display().to_string(),
                ]),
                VisualSource::Video(media) => {
                    args.extend(["-i".to_string(), media.path.display().to_string()])
                }
            }
        }

        for clip in &timeline.audio_clips {
            args.extend(["-i".to_string(), clip.source.path().display().to_string()]);
        }

        args.extend(["-filter_complex".to_string(), self.filter_graph(timeline)]);
        args.extend(["-map".to_string(), "[vout]".to_string()]);
        if !timeline.audio_clips.is_empty() {
            args.extend(["-map".to_string(), "[aout]".to_string()]);
        }

        args.extend([
            "-c:v".to_string(),
            self.config.codec.clone(),
            "-r".to_string(),
            fps.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-crf".to_string(),
            self.quality_to_crf(self.config.quality).to_string(),
        ]);

        if timeline.audio_clips.is_empty() {
            args.push("-an".to_string());
        } else {
            args.extend(["-c:a".to_string(), "aac".to_string()]);
        }

        args.extend([
            "-t".to_string(),
            format!("{:.3}", total),
            output_path.display().to_string(),
        ]);

        args
    }

    /// Build the `-filter_complex` graph. Input 0 is the black canvas,
    /// visual clips follow in layer order, then the audio clips.
    pub fn filter_graph(&self, timeline: &Timeline) -> String {
        let canvas = timeline.canvas;
        let visuals = timeline.layered_clips();
        let mut chains = Vec::new();

        for (i, clip) in visuals.iter().enumerate() {
            chains.push(format!("[{}:v]{}[v{}]", i + 1, Self::clip_filters(clip, canvas), i));
        }

        let mut current = "[0:v]".to_string();
        for (i, clip) in visuals.iter().enumerate() {
            let label = if i + 1 == visuals.len() {
                "[vout]".to_string()
            } else {
                format!("[o{}]", i)
            };
            let (x, y) = match (clip.layer, clip.position) {
                (_, Some(position)) => (position.x.to_string(), position.y.to_string()),
                (Layer::Base, None) => ("(W-w)/2".to_string(), "(H-h)/2".to_string()),
                (Layer::Overlay, None) => ("0".to_string(), "0".to_string()),
            };
            chains.push(format!(
                "{}[v{}]overlay=x={}:y={}:enable='between(t,{:.3},{:.3})':eof_action=pass{}",
                current,
                i,
                x,
                y,
                clip.start_time,
                clip.end_time(),
                label
            ));
            current = label;
        }

        if visuals.is_empty() {
            chains.push("[0:v]null[vout]".to_string());
        }

        let first_audio = visuals.len() + 1;
        for (i, clip) in timeline.audio_clips.iter().enumerate() {
            let delay_ms = (clip.start_time * 1000.0).round() as u64;
            chains.push(format!(
                "[{}:a]adelay={}:all=1[a{}]",
                first_audio + i,
                delay_ms,
                i
            ));
        }

        if !timeline.audio_clips.is_empty() {
            let inputs: String = (0..timeline.audio_clips.len())
                .map(|i| format!("[a{}]", i))
                .collect();
            chains.push(format!(
                "{}amix=inputs={}:normalize=0[aout]",
                inputs,
                timeline.audio_clips.len()
            ));
        }

        chains.join(";")
    }

    fn clip_filters(clip: &VisualClip, (width, height): (u32, u32)) -> String {
        let mut filters = Vec::new();

        match (clip.layer, clip.size) {
            (Layer::Base, size) => {
                let width = size.and_then(|s| s.width).unwrap_or(width);
                let height = size.and_then(|s| s.height).unwrap_or(height);
                filters.push(format!(
                    "scale={}:{}:force_original_aspect_ratio=decrease",
                    width, height
                ));
            }
            (Layer::Overlay, Some(size)) => filters.push(format!(
                "scale={}:{}",
                size.width.map_or(-1, i64::from),
                size.height.map_or(-1, i64::from)
            )),
            (Layer::Overlay, None) => {}
        }

        if clip.reversed {
            filters.push("reverse".to_string());
        }

        filters.push("format=yuva420p".to_string());

        if let Some(fade) = clip.fade_in {
            filters.push(format!("fade=t=in:st=0:d={:.3}:alpha=1", fade));
        }

        filters.push(format!("setpts=PTS-STARTPTS+{:.3}/TB", clip.start_time));
        filters.join(",")
    }

    fn quality_to_crf(&self, quality: u8) -> u8 {
        (51 - ((quality as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::timeline::{AudioClip, Position, Size, SlideSpan};
    use crate::speech::types::AudioHandle;
    use crate::video::types::{ImageHandle, OverlayMedia};

    fn image_clip(page: usize, start: f64, duration: f64, fade_in: Option<f64>) -> VisualClip {
        VisualClip {
            source: VisualSource::Image(ImageHandle::new(
                format!("tmp/slide-{}.png", page + 1),
                page,
                (1920, 1080),
            )),
            start_time: start,
            duration,
            layer: Layer::Base,
            position: None,
            size: None,
            fade_in,
            reversed: false,
        }
    }

    fn sample_timeline() -> Timeline {
        let mut timeline = Timeline::new((1280, 720));
        timeline.visual_clips.push(image_clip(0, 0.0, 2.8, None));
        timeline.visual_clips.push(VisualClip {
            source: VisualSource::Video(OverlayMedia::new("demo.mp4", 4.0)),
            start_time: 2.0,
            duration: 4.0,
            layer: Layer::Overlay,
            position: Some(Position { x: 320, y: 0 }),
            size: Some(Size {
                width: Some(640),
                height: None,
            }),
            fade_in: None,
            reversed: true,
        });
        timeline.visual_clips.push(image_clip(1, 2.0, 4.8, Some(0.8)));
        timeline.audio_clips.push(AudioClip {
            source: AudioHandle::new("tmp/speech_0.wav"),
            start_time: 0.0,
            duration: 1.5,
        });
        timeline.audio_clips.push(AudioClip {
            source: AudioHandle::new("tmp/speech_1.wav"),
            start_time: 2.25,
            duration: 1.0,
        });
        timeline.slides.push(SlideSpan {
            index: 0,
            start_time: 0.0,
            duration: 2.0,
        });
        timeline
    }

    #[test]
    fn test_quality_to_crf() {
        let encoder = TimelineEncoder::new(VideoConfig::default());
        assert_eq!(encoder.quality_to_crf(100), 0);
        assert_eq!(encoder.quality_to_crf(0), 51);
        assert!(encoder.quality_to_crf(85) < 10);
    }

    #[test]
    fn test_overlays_are_drawn_above_slides() {
        let encoder = TimelineEncoder::new(VideoConfig::default());
        let graph = encoder.filter_graph(&sample_timeline());

        // Base images come first, so the overlay is input 3.
        assert!(graph.contains("[3:v]scale=640:-1,reverse,format=yuva420p,setpts=PTS-STARTPTS+2.000/TB[v2]"));
        assert!(graph.contains(
            "[2:v]scale=1280:720:force_original_aspect_ratio=decrease,format=yuva420p,fade=t=in:st=0:d=0.800:alpha=1,setpts=PTS-STARTPTS+2.000/TB[v1]"
        ));
        assert!(graph.contains("[o1][v2]overlay=x=320:y=0:enable='between(t,2.000,6.000)':eof_action=pass[vout]"));
    }

    #[test]
    fn test_audio_is_delayed_and_mixed() {
        let encoder = TimelineEncoder::new(VideoConfig::default());
        let graph = encoder.filter_graph(&sample_timeline());

        assert!(graph.contains("[4:a]adelay=0:all=1[a0]"));
        assert!(graph.contains("[5:a]adelay=2250:all=1[a1]"));
        assert!(graph.ends_with("[a0][a1]amix=inputs=2:normalize=0[aout]"));
    }

    #[test]
    fn test_build_args() {
        let encoder = TimelineEncoder::new(VideoConfig::default());
        let timeline = sample_timeline();
        let args = encoder.build_args(&timeline, Path::new("out.mp4"));

        assert_eq!(args[args.len() - 1], "out.mp4");
        assert!(args.contains(&"color=c=black:s=1280x720:r=30:d=6.800".to_string()));
        assert!(args.contains(&"[aout]".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "-loop").count(), 2);
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_silent_timeline_has_no_audio_stream() {
        let encoder = TimelineEncoder::new(VideoConfig::default());
        let mut timeline = Timeline::new((640, 480));
        timeline.visual_clips.push(image_clip(0, 0.0, 2.0, None));

        let args = encoder.build_args(&timeline, Path::new("out.mp4"));
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"[aout]".to_string()));

        let graph = encoder.filter_graph(&Timeline::new((640, 480)));
        assert_eq!(graph, "[0:v]null[vout]");
    }
}
