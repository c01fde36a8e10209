use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    annotation::{Deck, DeckLoader, NormalizedDeck, Normalizer},
    composition::{compositor::Compositor, timeline::Timeline},
    config::Config,
    error::{CompositionError, Result},
    speech::{synthesize_all, SpeechClip, SpeechSynthesizer},
    video::{EncodedVideo, ImageHandle, OverlayMedia, OverlayProbe, Rasterizer, TimelineEncoder},
};

/// Orchestrates the whole deck-to-video process
///
/// The engine follows a clear pipeline:
/// 1. Annotation Loading - Read page records from the deck source
/// 2. Normalization - Resolve pages into timed physical slides
/// 3. Speech Synthesis - Produce one audio clip per narration cue
/// 4. Slide Rendering - Rasterize the deck PDF, one image per slide
/// 5. Overlay Probing - Measure every overlay video
/// 6. Timeline Composition - Lay out all clips on the timeline
/// 7. Output Generation - Encode the timeline to a video file
pub struct NarrationEngine {
    config: Config,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl NarrationEngine {
    /// Create a new engine with the given configuration and speech backend
    pub fn new(config: Config, synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        Self {
            config,
            synthesizer: Arc::from(synthesizer),
        }
    }

    /// Run the complete pipeline and write the video to `output_path`
    ///
    /// # Arguments
    ///
    /// * `input_path` - Annotated deck (typst source, or the JSON it exports);
    ///   the rendered PDF is expected next to it with a `.pdf` extension
    /// * `output_path` - Path for the final video
    pub async fn compose<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<EncodedVideo> {
        let output_path = output_path.as_ref();

        info!("🎬 Starting slide-narrator");
        info!("   Input: {:?}", input_path.as_ref());
        info!("   Output: {:?}", output_path);
        info!("   Speech: {}", self.synthesizer.name());

        let timeline = self.build(input_path.as_ref(), true).await?;

        // Pipeline Step 7: Output Generation
        let encoded = self.generate_output(&timeline, output_path).await?;

        info!("🎉 Narration complete! Output saved to: {:?}", output_path);
        Ok(encoded)
    }

    /// Run every step except encoding and return the timeline
    ///
    /// A missing PDF is tolerated here: slides get placeholder images at the
    /// paths the rasterizer would produce.
    pub async fn plan<P: AsRef<Path>>(&self, input_path: P) -> Result<Timeline> {
        info!("📝 Planning timeline for {:?}", input_path.as_ref());
        self.build(input_path.as_ref(), false).await
    }

    async fn build(&self, input_path: &Path, require_pdf: bool) -> Result<Timeline> {
        std::fs::create_dir_all(&self.config.work_dir)?;

        // Pipeline Step 1: Annotation Loading
        let deck = self.load_annotations(input_path).await?;

        // Pipeline Step 2: Normalization
        let normalizer = Normalizer::new(deck.defaults_or(&self.config.defaults));
        let normalized = self.normalize(&normalizer, &deck)?;

        // Pipeline Step 3: Speech Synthesis
        let speeches = self.synthesize_speech(&normalized).await?;

        // Pipeline Step 4: Slide Rendering
        let images = self.render_slides(input_path, &normalized, require_pdf).await?;

        // Pipeline Step 5: Overlay Probing
        let overlays = self.probe_overlays(input_path, &normalized).await?;

        // Pipeline Step 6: Timeline Composition
        self.compose_timeline(&deck, &normalized, &images, &speeches, &overlays)
    }

    // ==========================================
    // PIPELINE STEP 1: ANNOTATION LOADING
    // ==========================================

    async fn load_annotations(&self, input_path: &Path) -> Result<Deck> {
        info!("📖 Step 1: Loading annotations...");

        let deck = DeckLoader::load(input_path).await.map_err(|e| {
            warn!("Failed to load annotations: {}", e);
            e
        })?;

        info!("   ✅ Loaded {} pages ({} visible)", deck.pages.len(), deck.visible_pages());
        if deck.defaults.is_some() {
            debug!("Deck declares its own timing defaults");
        }

        Ok(deck)
    }

    // ==========================================
    // PIPELINE STEP 2: NORMALIZATION
    // ==========================================

    fn normalize(&self, normalizer: &Normalizer, deck: &Deck) -> Result<NormalizedDeck> {
        info!("🧮 Step 2: Normalizing slides...");

        let normalized = normalizer.normalize(&deck.pages)?;

        info!("   ✅ Normalization complete:");
        info!("      Logical slides: {}", normalized.logical.len());
        info!("      Physical slides: {}", normalized.physical.len());
        info!("      Narration cues: {}", normalized.speech_texts().len());
        info!("      Overlay cues: {}", normalized.overlay_cues().len());

        Ok(normalized)
    }

    // ==========================================
    // PIPELINE STEP 3: SPEECH SYNTHESIS
    // ==========================================

    async fn synthesize_speech(&self, normalized: &NormalizedDeck) -> Result<Vec<SpeechClip>> {
        info!("🗣️  Step 3: Synthesizing speech with {}...", self.synthesizer.name());

        let texts = normalized.speech_texts();
        let synthesizer = Arc::clone(&self.synthesizer);
        let parallelism = self.config.speech.parallelism;

        let clips = tokio::task::spawn_blocking(move || {
            synthesize_all(synthesizer.as_ref(), &texts, parallelism)
        })
        .await
        .map_err(|e| CompositionError::OutputFailed {
            reason: format!("speech synthesis task failed: {}", e),
        })??;

        let spoken: f64 = clips.iter().map(|clip| clip.duration).sum();
        info!("   ✅ Synthesized {} clips ({:.1}s of speech)", clips.len(), spoken);

        Ok(clips)
    }

    // ==========================================
    // PIPELINE STEP 4: SLIDE RENDERING
    // ==========================================

    async fn render_slides(
        &self,
        input_path: &Path,
        normalized: &NormalizedDeck,
        require_pdf: bool,
    ) -> Result<Vec<ImageHandle>> {
        info!("🖼️  Step 4: Rendering slides...");

        let pdf = input_path.with_extension("pdf");
        if !require_pdf && !pdf.exists() {
            warn!("{:?} not found, using placeholder images", pdf);
            let canvas = self.config.composition.canvas();
            return Ok(normalized
                .physical
                .iter()
                .map(|slide| {
                    let path = self.config.work_dir.join(format!("slide-{}.png", slide.page + 1));
                    ImageHandle::new(path, slide.page, canvas)
                })
                .collect());
        }

        let rasterizer = Rasterizer::new(self.config.video.dpi, self.config.work_dir.clone());
        let rendered = tokio::task::spawn_blocking(move || rasterizer.render_pages(&pdf))
            .await
            .map_err(|e| CompositionError::OutputFailed {
                reason: format!("rasterization task failed: {}", e),
            })??;

        let images = Rasterizer::select(&rendered, &normalized.physical)?;
        info!("   ✅ Rendered {} pages, {} slides used", rendered.len(), images.len());

        Ok(images)
    }

    // ==========================================
    // PIPELINE STEP 5: OVERLAY PROBING
    // ==========================================

    async fn probe_overlays(
        &self,
        input_path: &Path,
        normalized: &NormalizedDeck,
    ) -> Result<Vec<OverlayMedia>> {
        info!("📹 Step 5: Probing overlay videos...");

        let cues: Vec<_> = normalized.overlay_cues().into_iter().cloned().collect();
        if cues.is_empty() {
            info!("   ✅ No overlays");
            return Ok(Vec::new());
        }

        let root = input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let overlays = tokio::task::spawn_blocking(move || {
            let mut probe = OverlayProbe::new(root);
            cues.iter().map(|cue| probe.probe(cue)).collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(|e| CompositionError::OutputFailed {
            reason: format!("overlay probing task failed: {}", e),
        })??;

        for media in &overlays {
            debug!("      {:?}: {:.2}s", media.path, media.duration);
        }
        info!("   ✅ Probed {} overlays", overlays.len());

        Ok(overlays)
    }

    // ==========================================
    // PIPELINE STEP 6: TIMELINE COMPOSITION
    // ==========================================

    fn compose_timeline(
        &self,
        deck: &Deck,
        normalized: &NormalizedDeck,
        images: &[ImageHandle],
        speeches: &[SpeechClip],
        overlays: &[OverlayMedia],
    ) -> Result<Timeline> {
        info!("⏱️  Step 6: Composing timeline...");

        let compositor = Compositor::new(
            deck.defaults_or(&self.config.defaults),
            self.config.composition.canvas(),
            self.config.composition.audio_gap,
        );
        let timeline = compositor.compose(&normalized.physical, images, speeches, overlays)?;

        info!("   ✅ Timeline composed:");
        info!("      Duration: {:.2}s", timeline.duration());
        info!("      Visual clips: {}", timeline.visual_clips.len());
        info!("      Audio clips: {}", timeline.audio_clips.len());
        info!("      Narration: {:.2}s", timeline.narration_time());

        Ok(timeline)
    }

    // ==========================================
    // PIPELINE STEP 7: OUTPUT GENERATION
    // ==========================================

    async fn generate_output(&self, timeline: &Timeline, output_path: &Path) -> Result<EncodedVideo> {
        info!("💾 Step 7: Generating final output...");

        let encoder = TimelineEncoder::new(self.config.video.clone());
        let encoded = encoder.encode(timeline, output_path).await.map_err(|e| {
            warn!("Encoding failed: {}", e);
            e
        })?;

        info!("   ✅ Output generated:");
        info!("      Duration: {:.2}s", encoded.duration);
        info!("      File size: {} bytes", encoded.file_size);

        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::timeline::Layer;
    use crate::error::{AnnotationError, NarratorError};
    use crate::speech::PreviewSynthesizer;
    use tempfile::tempdir;

    const DECK: &str = r#"{
        "pages": [
            {"overlay": 0, "t2s": [
                {"t": "T2s", "v": {"start_from": 1, "body": "one two three four five"}}
            ]},
            {"overlay": 0, "hidden": true},
            {"overlay": 0, "t2s": [{"t": "T2s-duration-logical", "v": 3}]},
            {"overlay": 1}
        ],
        "t2sdefaults": {"duration_physical": 1, "transition": "fade", "transition_duration": 0.5}
    }"#;

    fn engine(work_dir: &Path) -> NarrationEngine {
        let mut config = Config::default();
        config.work_dir = work_dir.to_path_buf();
        config.speech.words_per_minute = 60.0;
        let synthesizer = Box::new(PreviewSynthesizer::new(work_dir, 60.0));
        NarrationEngine::new(config, synthesizer)
    }

    #[tokio::test]
    async fn test_plan_without_pdf() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("talk.json");
        std::fs::write(&input, DECK).unwrap();

        let timeline = engine(&dir.path().join("work")).plan(&input).await.unwrap();

        assert_eq!(timeline.slides.len(), 3);
        assert_eq!(timeline.audio_clips.len(), 1);
        assert!((timeline.audio_clips[0].duration - 5.0).abs() < 1e-9);

        // The logical slide's 3s are split over its two pages; the narration
        // spills over them and the last slide holds until it is done.
        assert!((timeline.slides[0].duration - 1.0).abs() < 1e-9);
        assert!((timeline.slides[1].duration - 1.5).abs() < 1e-9);
        assert!((timeline.slides[2].duration - 2.9).abs() < 1e-9);

        let pages: Vec<usize> = timeline
            .visual_clips
            .iter()
            .filter(|clip| clip.layer == Layer::Base)
            .map(|clip| match &clip.source {
                crate::composition::timeline::VisualSource::Image(image) => image.page,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(pages, vec![0, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = tempdir().unwrap();
        let result = engine(dir.path()).plan(dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(NarratorError::Io(_))));
    }

    #[tokio::test]
    async fn test_invalid_deck_is_reported() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("talk.json");
        std::fs::write(&input, r#"{"pages": [{"overlay": 1}]}"#).unwrap();

        let result = engine(dir.path()).plan(&input).await;
        assert!(matches!(
            result,
            Err(NarratorError::Annotation(AnnotationError::OrphanOverlay { .. }))
        ));
    }

    #[tokio::test]
    async fn test_compose_requires_pdf() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("talk.json");
        std::fs::write(&input, DECK).unwrap();

        let result = engine(dir.path()).compose(&input, dir.path().join("talk.mp4")).await;
        assert!(result.is_err());
    }
}
