use tracing::{debug, warn};

use crate::annotation::types::{
    Defaults, Directive, LogicalSlide, PageRecord, PhysicalSlide, VideoOverlayCue,
};
use crate::error::{AnnotationError, Result};

/// Normalizer output: resolved physical slides and the logical slides they belong to
#[derive(Debug, Clone, Default)]
pub struct NormalizedDeck {
    pub physical: Vec<PhysicalSlide>,
    pub logical: Vec<LogicalSlide>,
}

impl NormalizedDeck {
    /// Every speech text in global narration order
    pub fn speech_texts(&self) -> Vec<String> {
        self.physical
            .iter()
            .flat_map(|slide| slide.speeches.iter().cloned())
            .collect()
    }

    /// Every overlay cue in global order
    pub fn overlay_cues(&self) -> Vec<&VideoOverlayCue> {
        self.physical
            .iter()
            .flat_map(|slide| slide.video_overlays.iter())
            .collect()
    }
}

/// Groups raw pages into logical slides and resolves their directives
pub struct Normalizer {
    defaults: Defaults,
}

impl Normalizer {
    pub fn new(defaults: Defaults) -> Self {
        Self { defaults }
    }

    pub fn normalize(&self, pages: &[PageRecord]) -> Result<NormalizedDeck> {
        let logical = Self::group(pages)?;

        let mut physical = Vec::with_capacity(logical.iter().map(|l| l.physical_count).sum());
        for (logical_index, slide) in logical.iter().enumerate() {
            physical.extend(self.resolve(logical_index, slide)?);
        }

        debug!(
            "Normalized {} pages into {} logical / {} physical slides",
            pages.len(),
            logical.len(),
            physical.len()
        );

        Ok(NormalizedDeck { physical, logical })
    }

    /// Group visible pages into logical slides by overlay index
    fn group(pages: &[PageRecord]) -> Result<Vec<LogicalSlide>> {
        let mut logical: Vec<LogicalSlide> = Vec::new();

        for page in pages.iter().filter(|p| !p.hidden) {
            if page.overlay_index == 0 {
                logical.push(LogicalSlide {
                    first_page: page.page,
                    physical_count: 1,
                    pages: vec![page.page],
                    directives: page.directives.clone(),
                });
            } else {
                let current = logical
                    .last_mut()
                    .ok_or(AnnotationError::OrphanOverlay { page: page.page })?;
                current.physical_count += 1;
                current.pages.push(page.page);
            }
        }

        Ok(logical)
    }

    /// Allocate the physical slides of one logical slide and replay its directives
    fn resolve(&self, logical_index: usize, logical: &LogicalSlide) -> Result<Vec<PhysicalSlide>> {
        let count = logical.physical_count;
        let mut slides: Vec<PhysicalSlide> = logical
            .pages
            .iter()
            .map(|&page| PhysicalSlide::new(page, logical_index, self.defaults.duration_physical))
            .collect();

        let context = SlideContext {
            logical_slide: logical_index + 1,
            page: logical.first_page,
            physical_count: count,
        };
        let mut duration_set = false;

        for directive in &logical.directives {
            match directive {
                Directive::Speech(cue) => {
                    let index = context.cue_index("Speech", cue.start_from)?;
                    slides[index].speeches.push(cue.text.clone());
                }
                Directive::LogicalDuration { seconds } => {
                    context.claim_duration(&mut duration_set)?;
                    context.check_duration(*seconds)?;
                    for slide in slides.iter_mut() {
                        slide.duration = seconds / count as f64;
                    }
                }
                Directive::PhysicalDuration { seconds } => {
                    context.claim_duration(&mut duration_set)?;
                    let durations = context.reconcile(seconds)?;
                    for (slide, duration) in slides.iter_mut().zip(durations) {
                        slide.duration = duration;
                    }
                }
                Directive::VideoOverlay(cue) => {
                    let index = context.cue_index("Video overlay", cue.start_from)?;
                    slides[index].video_overlays.push(cue.clone());
                }
            }
        }

        Ok(slides)
    }
}

/// Diagnostic context for the logical slide being resolved
struct SlideContext {
    logical_slide: usize,
    page: usize,
    physical_count: usize,
}

impl SlideContext {
    /// Zero-based physical slide a cue starting at `start_from` lands on
    fn cue_index(&self, kind: &'static str, start_from: u32) -> Result<usize> {
        let index = start_from.saturating_sub(1) as usize;
        if index >= self.physical_count {
            return Err(AnnotationError::CueOutOfRange {
                kind,
                logical_slide: self.logical_slide,
                page: self.page,
                start_from,
                physical_count: self.physical_count,
            }
            .into());
        }
        Ok(index)
    }

    fn claim_duration(&self, duration_set: &mut bool) -> Result<()> {
        if *duration_set {
            return Err(AnnotationError::DuplicateDurationOverride {
                logical_slide: self.logical_slide,
                page: self.page,
            }
            .into());
        }
        *duration_set = true;
        Ok(())
    }

    fn check_duration(&self, value: f64) -> Result<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(AnnotationError::InvalidDuration {
                logical_slide: self.logical_slide,
                page: self.page,
                value,
            }
            .into())
        }
    }

    /// Pad or truncate a per-physical-slide duration list to the slide count
    fn reconcile(&self, seconds: &[f64]) -> Result<Vec<f64>> {
        let Some(&last) = seconds.last() else {
            return Err(AnnotationError::EmptyDurationList {
                logical_slide: self.logical_slide,
                page: self.page,
            }
            .into());
        };

        let mut durations = seconds.to_vec();
        if durations.len() < self.physical_count {
            if durations.len() != 1 {
                warn!(
                    "Logical slide {} (page {}) lists {} durations for {} physical slides, repeating the last one",
                    self.logical_slide,
                    self.page,
                    durations.len(),
                    self.physical_count
                );
            }
            durations.resize(self.physical_count, last);
        } else if durations.len() > self.physical_count {
            warn!(
                "Logical slide {} (page {}) lists {} durations for {} physical slides, ignoring the extra ones",
                self.logical_slide,
                self.page,
                durations.len(),
                self.physical_count
            );
            durations.truncate(self.physical_count);
        }

        for &duration in &durations {
            self.check_duration(duration)?;
        }

        Ok(durations)
    }
}

/// Normalize pages with the given defaults
pub fn normalize(pages: &[PageRecord], defaults: &Defaults) -> Result<NormalizedDeck> {
    Normalizer::new(defaults.clone()).normalize(pages)
}
