use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::annotation::types::VideoOverlayCue;
use crate::error::{Result, VideoError};
use crate::video::types::OverlayMedia;

/// Looks up overlay videos relative to the deck and reads their duration with `ffprobe`
pub struct OverlayProbe {
    root: PathBuf,
    duration_cache: HashMap<PathBuf, f64>,
}

impl OverlayProbe {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            duration_cache: HashMap::new(),
        }
    }

    /// Overlay sources are relative to the deck's directory
    pub fn resolve_path(&self, source: &Path) -> PathBuf {
        if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.root.join(source)
        }
    }

    pub fn probe(&mut self, cue: &VideoOverlayCue) -> Result<OverlayMedia> {
        let path = self.resolve_path(&cue.source);

        if let Some(&duration) = self.duration_cache.get(&path) {
            return Ok(OverlayMedia::new(path, duration));
        }

        if !path.exists() {
            return Err(VideoError::LoadFailed {
                path: path.display().to_string(),
            }
            .into());
        }

        let media = OverlayMedia::new(&path, Self::ffprobe_duration(&path)?);
        if !media.is_supported() {
            warn!("Overlay {:?} has an unusual extension", path);
        }
        debug!("Overlay {:?}: {:.2}s", path, media.duration);

        self.duration_cache.insert(path, media.duration);
        Ok(media)
    }

    fn ffprobe_duration(path: &Path) -> Result<f64> {
        let output = Command::new("ffprobe")
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .output()
            .map_err(|e| VideoError::ProbeFailed {
                path: path.display().to_string(),
                reason: format!("failed to run ffprobe: {}", e),
            })?;

        if !output.status.success() {
            return Err(VideoError::ProbeFailed {
                path: path.display().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Self::parse_duration(path, &String::from_utf8_lossy(&output.stdout))
    }

    /// Parse the single `duration` value printed by ffprobe
    pub fn parse_duration(path: &Path, stdout: &str) -> Result<f64> {
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .and_then(|line| line.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| {
                VideoError::ProbeFailed {
                    path: path.display().to_string(),
                    reason: format!("unexpected duration output '{}'", stdout.trim()),
                }
                .into()
            })
    }
}
