use serde::Serialize;

use crate::speech::types::AudioHandle;
use crate::video::types::{ImageHandle, OverlayMedia};

/// Stacking order of visual clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Layer {
    /// Slide images
    Base,
    /// Overlay videos, drawn above the slide images
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// Target size of a clip; a missing side keeps the aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VisualSource {
    Image(ImageHandle),
    Video(OverlayMedia),
}

impl VisualSource {
    pub fn path(&self) -> &std::path::Path {
        match self {
            VisualSource::Image(image) => image.path(),
            VisualSource::Video(video) => &video.path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualClip {
    pub source: VisualSource,
    pub start_time: f64,
    pub duration: f64,
    pub layer: Layer,

    /// Top-left corner on the canvas, origin when unset
    pub position: Option<Position>,

    pub size: Option<Size>,

    /// Length of the fade-in on the leading edge
    pub fade_in: Option<f64>,

    /// Played back to front
    pub reversed: bool,
}

impl VisualClip {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioClip {
    pub source: AudioHandle,
    pub start_time: f64,
    pub duration: f64,
}

impl AudioClip {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Where one physical slide sits on the running clock
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlideSpan {
    pub index: usize,
    pub start_time: f64,
    pub duration: f64,
}

/// The composed result: one video track of layered clips and one audio track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub canvas: (u32, u32),
    pub visual_clips: Vec<VisualClip>,
    pub audio_clips: Vec<AudioClip>,
    pub slides: Vec<SlideSpan>,
}

impl Timeline {
    pub fn new(canvas: (u32, u32)) -> Self {
        Self {
            canvas,
            visual_clips: Vec::new(),
            audio_clips: Vec::new(),
            slides: Vec::new(),
        }
    }

    /// Total length: the latest end of any clip
    pub fn duration(&self) -> f64 {
        let visual = self.visual_clips.iter().map(VisualClip::end_time);
        let audio = self.audio_clips.iter().map(AudioClip::end_time);
        visual.chain(audio).fold(0.0, f64::max)
    }

    /// Visual clips in drawing order: by layer, then by emission order
    pub fn layered_clips(&self) -> Vec<&VisualClip> {
        let mut clips: Vec<&VisualClip> = self.visual_clips.iter().collect();
        clips.sort_by_key(|clip| clip.layer);
        clips
    }

    /// Total narration time
    pub fn narration_time(&self) -> f64 {
        self.audio_clips.iter().map(|clip| clip.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_clip(start_time: f64, duration: f64, layer: Layer) -> VisualClip {
        VisualClip {
            source: VisualSource::Image(ImageHandle::new("slide-1.png", 0, (1920, 1080))),
            start_time,
            duration,
            layer,
            position: None,
            size: None,
            fade_in: None,
            reversed: false,
        }
    }

    #[test]
    fn test_duration_covers_all_clips() {
        let mut timeline = Timeline::new((1920, 1080));
        assert_eq!(timeline.duration(), 0.0);

        timeline.visual_clips.push(image_clip(0.0, 2.8, Layer::Base));
        timeline.audio_clips.push(AudioClip {
            source: AudioHandle::new("speech_0.wav"),
            start_time: 1.0,
            duration: 2.5,
        });
        assert_eq!(timeline.duration(), 3.5);
        assert_eq!(timeline.narration_time(), 2.5);
    }

    #[test]
    fn test_layered_clips_are_stable() {
        let mut timeline = Timeline::new((1920, 1080));
        timeline.visual_clips.push(image_clip(0.0, 1.0, Layer::Overlay));
        timeline.visual_clips.push(image_clip(0.0, 2.0, Layer::Base));
        timeline.visual_clips.push(image_clip(2.0, 3.0, Layer::Base));

        let ordered: Vec<(Layer, f64)> = timeline
            .layered_clips()
            .iter()
            .map(|clip| (clip.layer, clip.duration))
            .collect();
        assert_eq!(
            ordered,
            vec![(Layer::Base, 2.0), (Layer::Base, 3.0), (Layer::Overlay, 1.0)]
        );
    }
}
