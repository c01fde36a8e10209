use serde::Serialize;
use std::path::{Path, PathBuf};

/// A rendered slide image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageHandle {
    pub path: PathBuf,

    /// Source page the image was rendered from
    pub page: usize,

    /// Pixel dimensions (width, height)
    pub resolution: (u32, u32),
}

impl ImageHandle {
    pub fn new<P: Into<PathBuf>>(path: P, page: usize, resolution: (u32, u32)) -> Self {
        Self {
            path: path.into(),
            page,
            resolution,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An overlay video with its probed length
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayMedia {
    pub path: PathBuf,

    /// Length in seconds
    pub duration: f64,
}

impl OverlayMedia {
    pub fn new<P: Into<PathBuf>>(path: P, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }

    /// Get the file extension
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()?.to_str()
    }

    /// Check if this is a supported video format
    pub fn is_supported(&self) -> bool {
        matches!(
            self.extension().map(|e| e.to_lowercase()).as_deref(),
            Some("mp4") | Some("avi") | Some("mov") | Some("mkv") | Some("webm") | Some("gif")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_format_support() {
        assert!(OverlayMedia::new("demo.MP4", 1.0).is_supported());
        assert!(OverlayMedia::new("loop.webm", 1.0).is_supported());
        assert!(!OverlayMedia::new("notes.txt", 1.0).is_supported());
        assert!(!OverlayMedia::new("noext", 1.0).is_supported());
    }
}
