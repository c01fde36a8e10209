use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::annotation::types::PhysicalSlide;
use crate::error::{Result, VideoError};
use crate::video::types::ImageHandle;

const PAGE_PREFIX: &str = "slide";

/// Renders every page of the deck PDF to PNG with `pdftoppm`
pub struct Rasterizer {
    dpi: u32,
    output_dir: PathBuf,
}

impl Rasterizer {
    pub fn new<P: Into<PathBuf>>(dpi: u32, output_dir: P) -> Self {
        Self {
            dpi,
            output_dir: output_dir.into(),
        }
    }

    pub fn check_available() -> bool {
        Command::new("pdftoppm")
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Render all pages, returning one image per page in page order
    pub fn render_pages<P: AsRef<Path>>(&self, pdf: P) -> Result<Vec<ImageHandle>> {
        let pdf = pdf.as_ref();
        if !pdf.exists() {
            return Err(VideoError::RasterizeFailed {
                reason: format!("{} does not exist", pdf.display()),
            }
            .into());
        }

        if !Self::check_available() {
            return Err(VideoError::RasterizeFailed {
                reason: "pdftoppm not found. Please install poppler-utils.".to_string(),
            }
            .into());
        }

        std::fs::create_dir_all(&self.output_dir)?;
        self.remove_stale_pages()?;

        info!("Rasterizing {:?} at {} dpi", pdf, self.dpi);
        let output = Command::new("pdftoppm")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(self.output_dir.join(PAGE_PREFIX))
            .output()
            .map_err(|e| VideoError::RasterizeFailed {
                reason: format!("failed to run pdftoppm: {}", e),
            })?;

        if !output.status.success() {
            return Err(VideoError::RasterizeFailed {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        self.collect_pages()
    }

    fn remove_stale_pages(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.output_dir)? {
            let path = entry?.path();
            if page_number(&path).is_some() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Gather `slide-N.png` files sorted by page number
    pub fn collect_pages(&self) -> Result<Vec<ImageHandle>> {
        let mut numbered: Vec<(usize, PathBuf)> = std::fs::read_dir(&self.output_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| page_number(&path).map(|n| (n, path)))
            .collect();
        numbered.sort_by_key(|(n, _)| *n);

        numbered
            .into_iter()
            .map(|(number, path)| {
                let resolution = image::image_dimensions(&path).map_err(|_| VideoError::LoadFailed {
                    path: path.display().to_string(),
                })?;
                debug!("Page {} -> {:?} {:?}", number, path, resolution);
                Ok(ImageHandle::new(path, number - 1, resolution))
            })
            .collect()
    }

    /// Pick the rendered image of each physical slide's source page
    pub fn select(rendered: &[ImageHandle], slides: &[PhysicalSlide]) -> Result<Vec<ImageHandle>> {
        slides
            .iter()
            .map(|slide| {
                rendered
                    .iter()
                    .find(|image| image.page == slide.page)
                    .cloned()
                    .ok_or_else(|| {
                        VideoError::RasterizeFailed {
                            reason: format!(
                                "page {} was not rendered ({} pages available)",
                                slide.page + 1,
                                rendered.len()
                            ),
                        }
                        .into()
                    })
            })
            .collect()
    }
}

/// 1-based page number of a rendered page file, `slide-007.png` -> 7
fn page_number(path: &Path) -> Option<usize> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let number = stem.strip_prefix(PAGE_PREFIX)?.strip_prefix('-')?;
    number.parse().ok().filter(|&n| n > 0)
}
