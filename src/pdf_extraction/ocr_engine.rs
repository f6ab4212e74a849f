// OCR engine module - render a page, recognize it, join the fragments
use super::child_process::output_within;
use super::extraction_router::PageTextSource;
use super::lopdf_helper::{PageHandle, SourceDocument};
use super::system_pdf_renderer::Rasterizer;
use crate::config;
use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Upscaling applied before recognition; small print on labels needs it.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedFragment {
    pub text: String,
    pub confidence: f32,
}

/// A text recognizer. Built once per run and shared across pages.
pub trait Recognizer: Send + Sync {
    /// Fragments in the order the engine reports them.
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<RecognizedFragment>>;
}

/// Join fragments with single spaces, in recognizer order.
pub fn join_fragments(fragments: &[RecognizedFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tesseract via its command-line interface, word-level TSV output.
///
/// Owns a scratch directory for the page images it is handed; the directory
/// is removed when the recognizer is dropped.
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
    scratch: TempDir,
    counter: AtomicU64,
    time_limit: Duration,
}

impl TesseractRecognizer {
    pub fn new(language: &str) -> Result<Self> {
        Self::with_binary(config::tesseract_path(), language)
    }

    pub fn with_binary(binary: PathBuf, language: &str) -> Result<Self> {
        let time_limit = Duration::from_secs(config::DEFAULT_PAGE_TIMEOUT_SECS);
        let output = output_within(Command::new(&binary).arg("--version"), time_limit)?;
        if !output.status.success() {
            return Err(anyhow!("{} --version exited with {}", binary.display(), output.status));
        }
        let version = String::from_utf8_lossy(&output.stdout);
        log::info!(
            "OCR engine ready: {} (lang {})",
            version.lines().next().unwrap_or("tesseract"),
            language
        );

        Ok(Self {
            binary,
            language: language.to_string(),
            scratch: TempDir::new()?,
            counter: AtomicU64::new(0),
            time_limit,
        })
    }

    /// tesseract is killed if one page takes longer than this.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<RecognizedFragment>> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let input = self.scratch.path().join(format!("page-{n}.png"));
        image.save(&input).context("writing page image for tesseract")?;

        let output = output_within(
            Command::new(&self.binary)
                .arg(&input)
                .arg("stdout")
                .args(["-l", self.language.as_str()])
                .arg("tsv"),
            self.time_limit,
        );
        let _ = std::fs::remove_file(&input);
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

// Columns: level page block par line word left top width height conf text
fn parse_tsv(tsv: &str) -> Vec<RecognizedFragment> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.splitn(12, '\t').collect();
            if cols.len() < 12 || cols[0] != "5" {
                return None;
            }
            let text = cols[11].trim();
            if text.is_empty() {
                return None;
            }
            let confidence = cols[10].parse::<f32>().unwrap_or(-1.0);
            Some(RecognizedFragment {
                text: text.to_string(),
                confidence,
            })
        })
        .collect()
}

/// Render + recognize strategy.
pub struct RecognizedText {
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Box<dyn Recognizer>,
    scale: f32,
}

impl RecognizedText {
    pub fn new(
        rasterizer: Box<dyn Rasterizer>,
        recognizer: Box<dyn Recognizer>,
        scale: f32,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            scale,
        }
    }
}

impl PageTextSource for RecognizedText {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn page_text(&self, source: &SourceDocument, page: PageHandle) -> Result<String> {
        let image = self
            .rasterizer
            .render(source.path(), page.page_number(), self.scale)?;
        let fragments = self.recognizer.recognize(&image)?;
        Ok(join_fragments(&fragments))
    }
}
