use tracing::{debug, info};

use crate::{
    annotation::types::{Defaults, Dimension, PhysicalSlide, TransitionKind},
    composition::timeline::{AudioClip, Layer, Position, Size, SlideSpan, Timeline, VisualClip, VisualSource},
    error::{CompositionError, Result},
    speech::types::SpeechClip,
    video::types::{ImageHandle, OverlayMedia},
};

/// State carried from one slide to the next while walking the deck
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Playhead {
    /// Start of the slide being scheduled (seconds)
    pub time_played: f64,

    /// Narration already started but not yet covered by slide time
    pub audio_backlog: f64,

    /// Next entry of the speech clip list
    pub audio_cursor: usize,

    /// Next entry of the overlay media list
    pub overlay_cursor: usize,
}

/// Externally produced media, aligned with the slide walk
#[derive(Clone, Copy)]
struct Sources<'a> {
    images: &'a [ImageHandle],
    speeches: &'a [SpeechClip],
    overlays: &'a [OverlayMedia],
}

/// Schedules physical slides, narration and overlays onto one timeline
pub struct Compositor {
    defaults: Defaults,
    canvas: (u32, u32),
    audio_gap: f64,
}

impl Compositor {
    pub fn new(defaults: Defaults, canvas: (u32, u32), audio_gap: f64) -> Self {
        Self {
            defaults,
            canvas,
            audio_gap,
        }
    }

    /// Compose the timeline
    ///
    /// `images` holds one image per slide, `speeches` one clip per speech cue
    /// in narration order, `overlays` one media per overlay cue in deck order.
    pub fn compose(
        &self,
        slides: &[PhysicalSlide],
        images: &[ImageHandle],
        speeches: &[SpeechClip],
        overlays: &[OverlayMedia],
    ) -> Result<Timeline> {
        self.validate()?;

        let speech_cues = slides.iter().map(|s| s.speeches.len()).sum();
        let overlay_cues = slides.iter().map(|s| s.video_overlays.len()).sum();
        check_supply("slide images", slides.len(), images.len())?;
        check_supply("speech clips", speech_cues, speeches.len())?;
        check_supply("overlay videos", overlay_cues, overlays.len())?;

        let sources = Sources {
            images,
            speeches,
            overlays,
        };

        let (playhead, timeline) = slides.iter().enumerate().try_fold(
            (Playhead::default(), Timeline::new(self.canvas)),
            |(playhead, mut timeline), (index, slide)| {
                let extend = slides
                    .get(index + 1)
                    .map_or(true, PhysicalSlide::has_narration);
                let playhead =
                    self.schedule_slide(playhead, &mut timeline, index, slide, extend, sources)?;
                Ok::<_, crate::error::NarratorError>((playhead, timeline))
            },
        )?;

        info!(
            "Timeline: {} slides, {:.2}s, {} visual / {} audio clips",
            timeline.slides.len(),
            playhead.time_played,
            timeline.visual_clips.len(),
            timeline.audio_clips.len()
        );

        Ok(timeline)
    }

    fn validate(&self) -> Result<()> {
        self.defaults.validate_transition()?;

        if !(self.audio_gap >= 0.0 && self.audio_gap.is_finite()) {
            return Err(CompositionError::InvalidParameters {
                details: format!("audio gap {}", self.audio_gap),
            }
            .into());
        }

        Ok(())
    }

    /// Schedule one slide and return the playhead for the next one
    ///
    /// `extend` is set when the slide must hold until its narration is done:
    /// it is the last slide, or the next slide starts narration of its own.
    fn schedule_slide(
        &self,
        mut playhead: Playhead,
        timeline: &mut Timeline,
        index: usize,
        slide: &PhysicalSlide,
        extend: bool,
        sources: Sources<'_>,
    ) -> Result<Playhead> {
        let (canvas_width, canvas_height) = self.canvas;
        let mut duration = slide.duration;

        let mut overlay_span: f64 = 0.0;
        for cue in &slide.video_overlays {
            let media = &sources.overlays[playhead.overlay_cursor];
            playhead.overlay_cursor += 1;

            let x = resolve_dimension(cue.x, canvas_width);
            let y = resolve_dimension(cue.y, canvas_height);
            let width = resolve_dimension(cue.width, canvas_width)
                .filter(|&w| w > 0)
                .map(|w| w as u32);
            let height = resolve_dimension(cue.height, canvas_height)
                .filter(|&h| h > 0)
                .map(|h| h as u32);

            debug!(
                "Overlay {:?} on slide {} at {:.2}s ({:.2}s)",
                media.path, index, playhead.time_played, media.duration
            );

            timeline.visual_clips.push(VisualClip {
                source: VisualSource::Video(media.clone()),
                start_time: playhead.time_played,
                duration: media.duration,
                layer: Layer::Overlay,
                position: (x.is_some() || y.is_some()).then(|| Position {
                    x: x.unwrap_or(0),
                    y: y.unwrap_or(0),
                }),
                size: (width.is_some() || height.is_some()).then_some(Size { width, height }),
                fade_in: None,
                reversed: cue.reverse,
            });
            overlay_span = overlay_span.max(media.duration);
        }
        duration = duration.max(overlay_span);

        if slide.has_narration() && playhead.audio_backlog > 0.0 {
            return Err(CompositionError::UnabsorbedNarration {
                slide: index,
                backlog: playhead.audio_backlog,
            }
            .into());
        }

        let mut narration = 0.0;
        for _ in &slide.speeches {
            let clip = &sources.speeches[playhead.audio_cursor];
            playhead.audio_cursor += 1;

            let Some(handle) = clip.handle.as_ref().filter(|_| !clip.is_silent()) else {
                // Silent placeholder keeps its slot but plays nothing
                continue;
            };

            debug!(
                "Speech {:?} on slide {} at {:.2}s",
                handle.path,
                index,
                playhead.time_played + narration
            );
            timeline.audio_clips.push(AudioClip {
                source: handle.clone(),
                start_time: playhead.time_played + narration,
                duration: clip.duration,
            });
            narration += clip.duration + self.audio_gap;
        }
        playhead.audio_backlog += narration;

        if extend {
            duration = duration.max(playhead.audio_backlog + self.audio_gap);
        }
        playhead.audio_backlog = (playhead.audio_backlog - duration).max(0.0);

        let transition = self.defaults.transition_duration;
        let fade_in = (index > 0 && self.defaults.transition == TransitionKind::Fade)
            .then_some(transition);

        timeline.visual_clips.push(VisualClip {
            source: VisualSource::Image(sources.images[index].clone()),
            start_time: playhead.time_played,
            duration: duration + transition,
            layer: Layer::Base,
            position: None,
            size: Some(Size {
                width: Some(canvas_width),
                height: Some(canvas_height),
            }),
            fade_in,
            reversed: false,
        });
        timeline.slides.push(SlideSpan {
            index,
            start_time: playhead.time_played,
            duration,
        });

        debug!(
            "Slide {} at {:.2}s for {:.2}s (backlog {:.2}s)",
            index, playhead.time_played, duration, playhead.audio_backlog
        );

        playhead.time_played += duration;
        Ok(playhead)
    }
}

fn check_supply(what: &'static str, expected: usize, supplied: usize) -> Result<()> {
    if expected != supplied {
        return Err(CompositionError::SupplyMismatch {
            what,
            expected,
            supplied,
        }
        .into());
    }
    Ok(())
}

/// Absolute pixel value of an optional dimension against a canvas side
pub fn resolve_dimension(value: Option<Dimension>, reference: u32) -> Option<i64> {
    value.map(|dimension| dimension.resolve(reference))
}

/// Compose a timeline with an explicit configuration
pub fn compose(
    slides: &[PhysicalSlide],
    images: &[ImageHandle],
    speeches: &[SpeechClip],
    overlays: &[OverlayMedia],
    defaults: &Defaults,
    canvas: (u32, u32),
    audio_gap: f64,
) -> Result<Timeline> {
    Compositor::new(defaults.clone(), canvas, audio_gap).compose(slides, images, speeches, overlays)
}
