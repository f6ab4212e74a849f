// System PDF renderer using pdftoppm
use super::child_process::output_within;
use crate::config;
use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

/// PDF user space is 72 units per inch; scale 1.0 renders at 72 DPI.
pub const BASE_DPI: f32 = 72.0;

/// Turns one page into a raster image for recognition.
pub trait Rasterizer: Send + Sync {
    fn render(&self, pdf_path: &Path, page_number: u32, scale: f32) -> Result<DynamicImage>;
}

pub struct PdftoppmRasterizer {
    binary: PathBuf,
    time_limit: Duration,
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::with_binary(config::pdftoppm_path())
    }

    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            time_limit: Duration::from_secs(config::DEFAULT_PAGE_TIMEOUT_SECS),
        }
    }

    /// pdftoppm is killed if one page takes longer than this.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Fails if pdftoppm cannot be executed at all.
    pub fn probe(&self) -> Result<()> {
        // pdftoppm -v prints its version to stderr and exits 0 or 99 depending on build
        output_within(Command::new(&self.binary).arg("-v"), self.time_limit)?;
        Ok(())
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn render(&self, pdf_path: &Path, page_number: u32, scale: f32) -> Result<DynamicImage> {
        let temp_dir = TempDir::new()?;
        let output_prefix = temp_dir.path().join("page");
        let dpi = (BASE_DPI * scale).round().max(1.0) as u32;
        let page = page_number.to_string();

        log::debug!("pdftoppm page {} at {} dpi", page_number, dpi);
        let output = output_within(
            Command::new(&self.binary)
                .arg("-png")
                .arg("-singlefile")
                .args(["-f", page.as_str(), "-l", page.as_str()])
                .args(["-r", dpi.to_string().as_str()])
                .arg(pdf_path)
                .arg(&output_prefix),
            self.time_limit,
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("pdftoppm failed on page {}: {}", page_number, stderr.trim()));
        }

        // -singlefile drops the page-number suffix
        let output_file = temp_dir.path().join("page.png");
        let image = image::open(&output_file)
            .with_context(|| format!("loading rendered page from {:?}", output_file))?;
        log::debug!("page {} rendered {}x{}", page_number, image.width(), image.height());
        Ok(image)
    }
}
