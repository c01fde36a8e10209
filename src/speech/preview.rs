use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, SpeechError};
use crate::speech::types::{AudioHandle, SpeechClip, SpeechSynthesizer};

const PREVIEW_SAMPLE_RATE: u32 = 16_000;

/// Writes silent WAV files as long as the text would take to read aloud
///
/// Lets a deck be laid out and encoded without any TTS engine installed.
pub struct PreviewSynthesizer {
    output_dir: PathBuf,
    words_per_minute: f64,
}

impl PreviewSynthesizer {
    pub fn new<P: Into<PathBuf>>(output_dir: P, words_per_minute: f64) -> Self {
        Self {
            output_dir: output_dir.into(),
            words_per_minute,
        }
    }

    /// Estimated reading time of `text` in seconds
    pub fn estimate(&self, text: &str) -> f64 {
        let words = text.split_whitespace().count().max(1);
        words as f64 * 60.0 / self.words_per_minute
    }
}

impl SpeechSynthesizer for PreviewSynthesizer {
    fn name(&self) -> &str {
        "preview"
    }

    fn synthesize(&self, index: usize, text: &str) -> Result<SpeechClip> {
        let frames = (self.estimate(text) * PREVIEW_SAMPLE_RATE as f64).round() as u32;
        let path = self.output_dir.join(format!("speech_{}.wav", index));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: PREVIEW_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let failed = |e: hound::Error| SpeechError::SynthesisFailed {
            index,
            reason: e.to_string(),
        };

        let mut writer = hound::WavWriter::create(&path, spec).map_err(failed)?;
        for _ in 0..frames {
            writer.write_sample(0i16).map_err(failed)?;
        }
        writer.finalize().map_err(failed)?;

        let duration = frames as f64 / PREVIEW_SAMPLE_RATE as f64;
        debug!("Preview speech {} -> {:?} ({:.2}s)", index, path, duration);

        Ok(SpeechClip::new(AudioHandle::new(path), duration))
    }
}
