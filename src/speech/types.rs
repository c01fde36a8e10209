use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A synthesized narration file on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioHandle {
    pub path: PathBuf,
}

impl AudioHandle {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of synthesizing one speech cue
///
/// A clip with zero duration and no handle is a silent placeholder: it keeps
/// its slot in the cue order but produces no audio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechClip {
    /// Length in seconds
    pub duration: f64,

    pub handle: Option<AudioHandle>,
}

impl SpeechClip {
    pub fn new(handle: AudioHandle, duration: f64) -> Self {
        Self {
            duration,
            handle: Some(handle),
        }
    }

    pub fn silent() -> Self {
        Self {
            duration: 0.0,
            handle: None,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.handle.is_none() || self.duration <= 0.0
    }
}

/// Text-to-speech capability
///
/// Implementations are chosen once at startup and handed to the pipeline;
/// nothing downstream inspects which backend is in use.
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns the name of this backend, for logging
    fn name(&self) -> &str;

    /// Synthesize `text` as the `index`-th clip of the deck
    ///
    /// Only called for texts with visible content.
    fn synthesize(&self, index: usize, text: &str) -> Result<SpeechClip>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_placeholder() {
        let clip = SpeechClip::silent();
        assert!(clip.is_silent());
        assert_eq!(clip.duration, 0.0);

        let clip = SpeechClip::new(AudioHandle::new("speech_0.wav"), 1.5);
        assert!(!clip.is_silent());
        assert_eq!(clip.handle.unwrap().path(), Path::new("speech_0.wav"));
    }
}
