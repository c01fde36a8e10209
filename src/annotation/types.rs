use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AnnotationError, CompositionError, Result};

/// A single annotation attached to the first page of a logical slide
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Narration text, starting on the `start_from`-th physical slide (1-based)
    Speech(SpeechCue),

    /// Total duration of the logical slide, split evenly over its physical slides
    LogicalDuration { seconds: f64 },

    /// Per-physical-slide durations
    PhysicalDuration { seconds: Vec<f64> },

    /// A video composited on top of a physical slide
    VideoOverlay(VideoOverlayCue),
}

impl Directive {
    /// Tag name used in diagnostics
    pub fn tag(&self) -> &'static str {
        match self {
            Directive::Speech(_) => "speech",
            Directive::LogicalDuration { .. } => "duration_logical",
            Directive::PhysicalDuration { .. } => "duration_physical",
            Directive::VideoOverlay(_) => "overlay",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechCue {
    pub start_from: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoOverlayCue {
    pub start_from: u32,

    /// Overlay video, relative to the deck's directory
    pub source: PathBuf,

    pub x: Option<Dimension>,
    pub y: Option<Dimension>,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,

    /// Play the overlay backwards
    pub reverse: bool,
}

/// Overlay geometry, either absolute or relative to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Dimension {
    Pixels(f64),
    Percent(f64),
}

impl Dimension {
    /// Parse the textual form used in annotations: `"25%"` or `"120"`
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let invalid = || AnnotationError::InvalidDimension {
            value: value.to_string(),
        };

        let dimension = match trimmed.strip_suffix('%') {
            Some(percent) => Dimension::Percent(percent.trim().parse().map_err(|_| invalid())?),
            None => Dimension::Pixels(trimmed.parse().map_err(|_| invalid())?),
        };

        match dimension {
            Dimension::Pixels(v) | Dimension::Percent(v) if !v.is_finite() => Err(invalid().into()),
            _ => Ok(dimension),
        }
    }

    /// Absolute pixel value against a reference length, rounded to whole pixels
    pub fn resolve(&self, reference: u32) -> i64 {
        match *self {
            Dimension::Pixels(v) => v.round() as i64,
            Dimension::Percent(p) => (reference as f64 * p / 100.0).round() as i64,
        }
    }
}

/// One raw page of the deck, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Zero-based position of the page in the document
    pub page: usize,

    pub hidden: bool,

    /// 0 opens a new logical slide, anything else continues the current one
    pub overlay_index: usize,

    pub directives: Vec<Directive>,
}

/// Transition between consecutive physical slides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    #[default]
    None,
    Fade,
}

/// Deck-wide timing defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    /// Duration of a physical slide without overrides (seconds)
    pub duration_physical: f64,

    #[serde(default)]
    pub transition: TransitionKind,

    /// Length of the cross-fade between slides (seconds)
    #[serde(default)]
    pub transition_duration: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            duration_physical: 2.0,
            transition: TransitionKind::None,
            transition_duration: 0.0,
        }
    }
}

impl Defaults {
    /// A `none` transition must not declare a duration
    pub fn validate_transition(&self) -> Result<()> {
        if self.transition == TransitionKind::None && self.transition_duration != 0.0 {
            return Err(CompositionError::InvalidTransition {
                duration: self.transition_duration,
            }
            .into());
        }

        if !(self.transition_duration >= 0.0 && self.transition_duration.is_finite()) {
            return Err(CompositionError::InvalidParameters {
                details: format!("transition duration {}", self.transition_duration),
            }
            .into());
        }

        Ok(())
    }
}

/// A parsed deck: raw pages plus the defaults the document declares, if any
#[derive(Debug, Clone, Default)]
pub struct Deck {
    pub pages: Vec<PageRecord>,
    pub defaults: Option<Defaults>,
}

impl Deck {
    /// Deck defaults when present, otherwise the given fallback
    pub fn defaults_or(&self, fallback: &Defaults) -> Defaults {
        self.defaults.clone().unwrap_or_else(|| fallback.clone())
    }

    pub fn visible_pages(&self) -> usize {
        self.pages.iter().filter(|p| !p.hidden).count()
    }
}

/// One authored slide, spanning `physical_count` visible pages
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSlide {
    pub first_page: usize,
    pub physical_count: usize,

    /// Visible pages of this slide, `physical_count` long
    pub pages: Vec<usize>,

    pub directives: Vec<Directive>,
}

/// One rendered page with its resolved timing and cues
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalSlide {
    /// Source page, used to pick the rendered image
    pub page: usize,

    /// Zero-based index of the owning logical slide
    pub logical_index: usize,

    pub duration: f64,

    /// Narration texts in narration order
    pub speeches: Vec<String>,

    pub video_overlays: Vec<VideoOverlayCue>,
}

impl PhysicalSlide {
    pub fn new(page: usize, logical_index: usize, duration: f64) -> Self {
        Self {
            page,
            logical_index,
            duration,
            speeches: Vec::new(),
            video_overlays: Vec::new(),
        }
    }

    pub fn has_narration(&self) -> bool {
        !self.speeches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_parsing() {
        assert_eq!(Dimension::parse("25%").unwrap(), Dimension::Percent(25.0));
        assert_eq!(Dimension::parse(" 120 ").unwrap(), Dimension::Pixels(120.0));
        assert_eq!(Dimension::parse("12.5 %").unwrap(), Dimension::Percent(12.5));
        assert!(Dimension::parse("wide").is_err());
        assert!(Dimension::parse("%").is_err());
    }

    #[test]
    fn test_dimension_resolution_rounds() {
        assert_eq!(Dimension::Percent(50.0).resolve(1920), 960);
        assert_eq!(Dimension::Percent(33.3).resolve(1080), 360); // 359.64
        assert_eq!(Dimension::Pixels(99.6).resolve(1920), 100);
        assert_eq!(Dimension::Pixels(-10.0).resolve(1920), -10);
    }

    #[test]
    fn test_transition_validation() {
        let mut defaults = Defaults::default();
        assert!(defaults.validate_transition().is_ok());

        defaults.transition_duration = 0.5;
        assert!(defaults.validate_transition().is_err());

        defaults.transition = TransitionKind::Fade;
        assert!(defaults.validate_transition().is_ok());

        defaults.transition_duration = -1.0;
        assert!(defaults.validate_transition().is_err());
    }
}
