use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::{Result, SpeechError};

/// Reads the playing time of synthesized speech files
pub struct AudioProbe;

impl AudioProbe {
    /// Duration of an audio file in seconds
    pub fn duration<P: AsRef<Path>>(path: P) -> Result<f64> {
        let path = path.as_ref();
        let extension = Self::detect_format(path).unwrap_or_default();

        let duration = match extension.as_str() {
            "wav" => Self::wav_duration(path)?,
            "mp3" | "flac" | "ogg" | "m4a" | "aac" => Self::symphonia_duration(path)?,
            _ => {
                return Err(SpeechError::UnsupportedFormat {
                    format: extension,
                }
                .into())
            }
        };

        debug!("{:?}: {:.3}s", path, duration);
        Ok(duration)
    }

    /// WAV files via hound, from the header alone
    fn wav_duration(path: &Path) -> Result<f64> {
        let reader = hound::WavReader::open(path).map_err(|_| SpeechError::LoadFailed {
            path: path.display().to_string(),
        })?;

        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(SpeechError::LoadFailed {
                path: path.display().to_string(),
            }
            .into());
        }

        Ok(reader.duration() as f64 / spec.sample_rate as f64)
    }

    /// Compressed formats via Symphonia, counting packets when the container has no frame count
    fn symphonia_duration(path: &Path) -> Result<f64> {
        let load_failed = || SpeechError::LoadFailed {
            path: path.display().to_string(),
        };

        let file = File::open(path).map_err(|_| load_failed())?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|_| load_failed())?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(load_failed)?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
            if rate > 0 {
                return Ok(frames as f64 / rate as f64);
            }
        }

        let time_base = params.time_base.ok_or_else(load_failed)?;
        let mut ticks = 0u64;
        loop {
            match format.next_packet() {
                Ok(packet) if packet.track_id() == track_id => ticks += packet.dur(),
                Ok(_) => continue,
                Err(SymphoniaError::ResetRequired) => continue,
                Err(_) => break,
            }
        }

        let time = time_base.calc_time(ticks);
        Ok(time.seconds as f64 + time.frac)
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as u32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_wav_duration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        write_wav(&path, 16000, 2, 24000);

        let duration = AudioProbe::duration(&path).unwrap();
        assert!((duration - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioProbe::detect_format("a.WAV"), Some("wav".to_string()));
        assert_eq!(AudioProbe::detect_format("a"), None);
    }

    #[test]
    fn test_unsupported_format() {
        let result = AudioProbe::duration("speech.xyz");
        if let Err(crate::error::NarratorError::Speech(SpeechError::UnsupportedFormat { format })) = result {
            assert_eq!(format, "xyz");
        } else {
            panic!("Expected UnsupportedFormat error");
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(AudioProbe::duration("/nonexistent/speech.wav").is_err());
    }
}
