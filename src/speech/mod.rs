//! # Speech Module
//!
//! Turns narration texts into audio clips. A single [`SpeechSynthesizer`]
//! backend is chosen from the configuration at startup and passed into the
//! pipeline; clips come back in the same order as the cues that produced them.
//!
//! ## Backends
//!
//! - **preview**: silent WAV files sized from the word count
//! - **command**: any local TTS program (espeak-ng, piper, ...)
//! - **openai**: hosted speech endpoint (feature `openai`)

pub mod command;
#[cfg(feature = "openai")]
pub mod openai;
pub mod preview;
pub mod probe;
pub mod types;

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{SpeechBackend, SpeechConfig};
use crate::error::{Result, SpeechError};

pub use command::CommandSynthesizer;
#[cfg(feature = "openai")]
pub use openai::OpenAiSynthesizer;
pub use preview::PreviewSynthesizer;
pub use probe::AudioProbe;
pub use types::{AudioHandle, SpeechClip, SpeechSynthesizer};

/// Build the configured backend, writing its clips into `output_dir`
pub fn build_synthesizer(
    config: &SpeechConfig,
    output_dir: &Path,
) -> Result<Box<dyn SpeechSynthesizer>> {
    let synthesizer: Box<dyn SpeechSynthesizer> = match config.backend {
        SpeechBackend::Preview => Box::new(PreviewSynthesizer::new(
            output_dir,
            config.words_per_minute,
        )),
        SpeechBackend::Command => {
            let synth = CommandSynthesizer::new(&config.command, output_dir);
            synth.check_available()?;
            Box::new(synth)
        }
        #[cfg(feature = "openai")]
        SpeechBackend::OpenAi => Box::new(OpenAiSynthesizer::new(&config.openai, output_dir)?),
        #[cfg(not(feature = "openai"))]
        SpeechBackend::OpenAi => {
            return Err(SpeechError::BackendUnavailable {
                backend: "openai".to_string(),
                reason: "built without the `openai` feature".to_string(),
            }
            .into())
        }
    };

    debug!("Speech backend: {}", synthesizer.name());
    Ok(synthesizer)
}

/// Synthesize every text, returning clips in input order
///
/// Blank texts become silent placeholders without reaching the backend.
/// Up to `parallelism` clips are produced at once.
pub fn synthesize_all(
    synthesizer: &dyn SpeechSynthesizer,
    texts: &[String],
    parallelism: usize,
) -> Result<Vec<SpeechClip>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.max(1))
        .build()
        .map_err(|e| SpeechError::BackendUnavailable {
            backend: synthesizer.name().to_string(),
            reason: e.to_string(),
        })?;

    let clips = pool.install(|| {
        texts
            .par_iter()
            .enumerate()
            .map(|(index, text)| {
                if text.trim().is_empty() {
                    return Ok(SpeechClip::silent());
                }
                info!("Generating speech {}/{}: {}", index + 1, texts.len(), text);
                synthesizer.synthesize(index, text)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed-length clips that record how often the backend was reached
    struct CountingSynth {
        calls: AtomicUsize,
    }

    impl SpeechSynthesizer for CountingSynth {
        fn name(&self) -> &str {
            "counting"
        }

        fn synthesize(&self, index: usize, _text: &str) -> Result<SpeechClip> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SpeechClip::new(
                AudioHandle::new(format!("speech_{}.wav", index)),
                index as f64 + 1.0,
            ))
        }
    }

    #[test]
    fn test_clips_keep_cue_order() {
        let synth = CountingSynth {
            calls: AtomicUsize::new(0),
        };
        let texts: Vec<String> = ["one", "", "three", "  ", "five"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let clips = synthesize_all(&synth, &texts, 4).unwrap();

        assert_eq!(clips.len(), 5);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 3);
        assert_eq!(clips[0].duration, 1.0);
        assert!(clips[1].is_silent());
        assert_eq!(clips[2].duration, 3.0);
        assert!(clips[3].is_silent());
        assert_eq!(clips[4].handle.as_ref().unwrap().path(), Path::new("speech_4.wav"));
    }

    #[test]
    fn test_build_preview_backend() {
        let config = SpeechConfig::default();
        let synth = build_synthesizer(&config, Path::new("/tmp")).unwrap();
        assert_eq!(synth.name(), "preview");
    }

    #[test]
    fn test_command_backend_requires_program() {
        let mut config = SpeechConfig {
            backend: SpeechBackend::Command,
            ..SpeechConfig::default()
        };
        config.command.program = "definitely-not-a-tts-engine".to_string();
        assert!(build_synthesizer(&config, Path::new("/tmp")).is_err());
    }
}
