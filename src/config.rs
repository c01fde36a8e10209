use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    annotation::types::{Defaults, TransitionKind},
    error::{ConfigError, Result},
};

/// Main configuration for slide-narrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for synthesized speech and rendered slides
    pub work_dir: PathBuf,

    /// Timing defaults, used when the deck declares none
    pub defaults: Defaults,

    /// Timeline composition settings
    pub composition: CompositionConfig,

    /// Speech synthesis settings
    pub speech: SpeechConfig,

    /// Rasterization and encoding settings
    pub video: VideoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("./tmp"),
            defaults: Defaults::default(),
            composition: CompositionConfig::default(),
            speech: SpeechConfig::default(),
            video: VideoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_defaults(&self.defaults)?;
        self.composition.validate()?;
        self.speech.validate()?;
        self.video.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn validate_defaults(defaults: &Defaults) -> Result<()> {
    if !(defaults.duration_physical > 0.0 && defaults.duration_physical.is_finite()) {
        return Err(invalid("defaults.duration_physical", defaults.duration_physical).into());
    }

    if defaults.transition_duration < 0.0
        || (defaults.transition == TransitionKind::None && defaults.transition_duration != 0.0)
    {
        return Err(invalid("defaults.transition_duration", defaults.transition_duration).into());
    }

    Ok(())
}

/// Timeline composition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Silence after each narration clip (seconds)
    pub audio_gap: f64,

    /// Output canvas width in pixels, also the reference for percentage geometry
    pub canvas_width: u32,

    /// Output canvas height in pixels
    pub canvas_height: u32,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            audio_gap: 0.2,
            canvas_width: 1920,
            canvas_height: 1080,
        }
    }
}

impl CompositionConfig {
    pub fn canvas(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    fn validate(&self) -> Result<()> {
        if !(self.audio_gap >= 0.0 && self.audio_gap.is_finite()) {
            return Err(invalid("composition.audio_gap", self.audio_gap).into());
        }

        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(invalid(
                "composition.canvas",
                format!("{}x{}", self.canvas_width, self.canvas_height),
            )
            .into());
        }

        Ok(())
    }
}

/// Available speech synthesis backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// Silent clips sized from the text, for previews and dry runs
    #[default]
    Preview,
    /// Any local TTS program writing a WAV file
    Command,
    /// Hosted speech endpoint
    OpenAi,
}

impl std::str::FromStr for SpeechBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preview" => Ok(Self::Preview),
            "command" => Ok(Self::Command),
            "openai" => Ok(Self::OpenAi),
            _ => Err(invalid("speech.backend", s)),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,

    /// Speaking rate assumed by the preview backend
    pub words_per_minute: f64,

    /// Number of clips synthesized concurrently
    pub parallelism: usize,

    pub command: CommandConfig,

    pub openai: OpenAiConfig,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::default(),
            words_per_minute: 150.0,
            parallelism: num_cpus::get(),
            command: CommandConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl SpeechConfig {
    fn validate(&self) -> Result<()> {
        if !(self.words_per_minute > 0.0 && self.words_per_minute.is_finite()) {
            return Err(invalid("speech.words_per_minute", self.words_per_minute).into());
        }

        if self.parallelism == 0 {
            return Err(invalid("speech.parallelism", self.parallelism).into());
        }

        if self.backend == SpeechBackend::Command && self.command.program.trim().is_empty() {
            return Err(ConfigError::MissingKey {
                key: "speech.command.program".to_string(),
            }
            .into());
        }

        if self.backend == SpeechBackend::OpenAi && !(self.openai.speed > 0.0) {
            return Err(invalid("speech.openai.speed", self.openai.speed).into());
        }

        Ok(())
    }
}

/// External TTS program. `{text}` and `{output}` in the arguments are substituted per clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            args: vec!["-w".to_string(), "{output}".to_string(), "{text}".to_string()],
        }
    }
}

/// Hosted speech endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// File holding the API key
    pub api_key_file: PathBuf,
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub speed: f64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_file: PathBuf::from("openai.key"),
            endpoint: "https://api.openai.com/v1/audio/speech".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
        }
    }
}

/// Rasterization and encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Output frame rate
    pub fps: f64,

    /// Rasterization resolution
    pub dpi: u32,

    /// Video codec passed to the encoder
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            dpi: 200,
            codec: "libx264".to_string(),
            quality: 85,
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if !(self.fps > 0.0 && self.fps.is_finite()) {
            return Err(invalid("video.fps", self.fps).into());
        }

        if self.dpi == 0 {
            return Err(invalid("video.dpi", self.dpi).into());
        }

        if self.quality > 100 {
            return Err(invalid("video.quality", self.quality).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.defaults.transition = TransitionKind::Fade;
        original_config.defaults.transition_duration = 0.8;
        original_config.speech.backend = SpeechBackend::OpenAi;

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config.defaults, loaded_config.defaults);
        assert_eq!(loaded_config.speech.backend, SpeechBackend::OpenAi);
        assert_eq!(original_config.video.fps, loaded_config.video.fps);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [composition]
            audio_gap = 0.5

            [speech]
            backend = "command"
            "#,
        )
        .unwrap();

        assert_eq!(config.composition.audio_gap, 0.5);
        assert_eq!(config.composition.canvas(), (1920, 1080));
        assert_eq!(config.speech.backend, SpeechBackend::Command);
        assert_eq!(config.speech.command.program, "espeak-ng");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_none_transition_with_duration_is_invalid() {
        let mut config = Config::default();
        config.defaults.transition_duration = 0.8;
        assert!(config.validate().is_err());

        config.defaults.transition = TransitionKind::Fade;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.composition.audio_gap = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.defaults.duration_physical = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.speech.parallelism = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("OpenAI".parse::<SpeechBackend>().unwrap(), SpeechBackend::OpenAi);
        assert_eq!("preview".parse::<SpeechBackend>().unwrap(), SpeechBackend::Preview);
        assert!("paddle".parse::<SpeechBackend>().is_err());
    }
}
