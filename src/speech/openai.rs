use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::error::{Result, SpeechError};
use crate::speech::probe::AudioProbe;
use crate::speech::types::{AudioHandle, SpeechClip, SpeechSynthesizer};

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
    speed: f64,
}

/// Hosted speech endpoint speaking the OpenAI audio API
pub struct OpenAiSynthesizer {
    config: OpenAiConfig,
    api_key: String,
    output_dir: PathBuf,
}

impl OpenAiSynthesizer {
    /// Read the API key and prepare the backend
    pub fn new<P: Into<PathBuf>>(config: &OpenAiConfig, output_dir: P) -> Result<Self> {
        let api_key = std::fs::read_to_string(&config.api_key_file)
            .map_err(|e| SpeechError::BackendUnavailable {
                backend: "openai".to_string(),
                reason: format!("cannot read API key from {:?}: {}", config.api_key_file, e),
            })?
            .trim()
            .to_string();

        if api_key.is_empty() {
            return Err(SpeechError::BackendUnavailable {
                backend: "openai".to_string(),
                reason: format!("API key file {:?} is empty", config.api_key_file),
            }
            .into());
        }

        Ok(Self {
            config: config.clone(),
            api_key,
            output_dir: output_dir.into(),
        })
    }

    fn request<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.config.model,
            voice: &self.config.voice,
            input: text,
            response_format: "wav",
            speed: self.config.speed,
        }
    }
}

impl SpeechSynthesizer for OpenAiSynthesizer {
    fn name(&self) -> &str {
        "openai"
    }

    fn synthesize(&self, index: usize, text: &str) -> Result<SpeechClip> {
        let failed = |reason: String| SpeechError::SynthesisFailed { index, reason };
        let path = self.output_dir.join(format!("speech_{}.wav", index));

        // Blocking clients own a runtime, so build one on the synthesis thread
        let client = reqwest::blocking::Client::new();
        let response = client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(text))
            .send()
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(failed(format!("{}: {}", status, body.trim())).into());
        }

        let audio = response.bytes().map_err(|e| failed(e.to_string()))?;
        std::fs::write(&path, &audio)?;
        debug!("Speech {} -> {:?} ({} bytes)", index, path, audio.len());

        let duration = AudioProbe::duration(&path)?;
        Ok(SpeechClip::new(AudioHandle::new(path), duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_key_file() {
        let config = OpenAiConfig {
            api_key_file: PathBuf::from("/nonexistent/openai.key"),
            ..OpenAiConfig::default()
        };
        assert!(OpenAiSynthesizer::new(&config, "/tmp").is_err());
    }

    #[test]
    fn test_request_body() {
        let dir = tempdir().unwrap();
        let key_file = dir.path().join("key");
        std::fs::write(&key_file, "sk-test\n").unwrap();

        let config = OpenAiConfig {
            api_key_file: key_file,
            voice: "nova".to_string(),
            speed: 1.25,
            ..OpenAiConfig::default()
        };
        let synth = OpenAiSynthesizer::new(&config, dir.path()).unwrap();
        assert_eq!(synth.api_key, "sk-test");

        let body = serde_json::to_value(synth.request("Welcome")).unwrap();
        assert_eq!(body["input"], "Welcome");
        assert_eq!(body["voice"], "nova");
        assert_eq!(body["response_format"], "wav");
        assert_eq!(body["speed"], 1.25);
    }
}
