use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::config::CommandConfig;
use crate::error::{Result, SpeechError};
use crate::speech::probe::AudioProbe;
use crate::speech::types::{AudioHandle, SpeechClip, SpeechSynthesizer};

/// Runs a local TTS program once per clip
///
/// Argument templates may use `{text}` and `{output}`; the program must write
/// a WAV file to `{output}`.
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    output_dir: PathBuf,
}

impl CommandSynthesizer {
    pub fn new<P: Into<PathBuf>>(config: &CommandConfig, output_dir: P) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            output_dir: output_dir.into(),
        }
    }

    /// Check that the program is on PATH and executable
    pub fn check_available(&self) -> Result<()> {
        if which::which(&self.program).is_ok() {
            return Ok(());
        }

        Err(SpeechError::BackendUnavailable {
            backend: "command".to_string(),
            reason: format!("'{}' not found on PATH or not executable", self.program),
        }
        .into())
    }

    fn expand_args(&self, text: &str, output: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{output}", output).replace("{text}", text))
            .collect()
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn name(&self) -> &str {
        "command"
    }

    fn synthesize(&self, index: usize, text: &str) -> Result<SpeechClip> {
        let path = self.output_dir.join(format!("speech_{}.wav", index));
        let args = self.expand_args(text, &path.display().to_string());

        debug!("Running {} for speech {}", self.program, index);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| SpeechError::SynthesisFailed {
                index,
                reason: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(SpeechError::SynthesisFailed {
                index,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let duration = AudioProbe::duration(&path)?;
        Ok(SpeechClip::new(AudioHandle::new(path), duration))
    }
}
