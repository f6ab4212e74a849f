// Configuration for label-sorter: defaults, settings file, tool paths
use crate::keyword_table::MatchMode;
use crate::pdf_extraction::{TextStrategy, DEFAULT_RENDER_SCALE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "label-sorter.toml";
pub const DEFAULT_TABLE: &str = "couriers";
pub const DEFAULT_LANGUAGE: &str = "eng";
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 120;

// Get tool paths from environment or rely on PATH
pub fn pdftoppm_path() -> PathBuf {
    env::var("LABEL_SORTER_PDFTOPPM")
        .unwrap_or_else(|_| "pdftoppm".to_string())
        .into()
}

pub fn tesseract_path() -> PathBuf {
    env::var("LABEL_SORTER_TESSERACT")
        .unwrap_or_else(|_| "tesseract".to_string())
        .into()
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Settings file contents. Every field is optional so a file and the
/// command line can be layered with `merge`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub table: TableSettings,
    #[serde(default)]
    pub extraction: ExtractionSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TableSettings {
    /// Built-in table name or path to a table TOML file.
    pub source: Option<String>,
    pub match_mode: Option<MatchMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExtractionSettings {
    pub strategy: Option<TextStrategy>,
    pub scale: Option<f32>,
    pub language: Option<String>,
    pub jobs: Option<usize>,
    pub page_timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub table: String,
    pub match_mode: Option<MatchMode>,
    pub strategy: TextStrategy,
    pub scale: f32,
    pub language: String,
    pub jobs: usize,
    pub page_timeout: Duration,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing settings file {}", path.display()))
    }

    /// Look in the working directory, then the user config directory.
    /// No file found is not an error.
    pub fn discover() -> Result<Self> {
        let mut candidates = vec![PathBuf::from(SETTINGS_FILE)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("label-sorter").join(SETTINGS_FILE));
        }
        for path in candidates {
            if path.is_file() {
                log::debug!("using settings from {}", path.display());
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Values in `overrides` win over values in `self`.
    pub fn merge(self, overrides: Settings) -> Settings {
        Settings {
            table: TableSettings {
                source: overrides.table.source.or(self.table.source),
                match_mode: overrides.table.match_mode.or(self.table.match_mode),
            },
            extraction: ExtractionSettings {
                strategy: overrides.extraction.strategy.or(self.extraction.strategy),
                scale: overrides.extraction.scale.or(self.extraction.scale),
                language: overrides.extraction.language.or(self.extraction.language),
                jobs: overrides.extraction.jobs.or(self.extraction.jobs),
                page_timeout_secs: overrides
                    .extraction
                    .page_timeout_secs
                    .or(self.extraction.page_timeout_secs),
            },
        }
    }

    pub fn resolve(self) -> RunSettings {
        RunSettings {
            table: self.table.source.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            match_mode: self.table.match_mode,
            strategy: self.extraction.strategy.unwrap_or_default(),
            scale: self.extraction.scale.unwrap_or(DEFAULT_RENDER_SCALE),
            language: self
                .extraction
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            jobs: self.extraction.jobs.unwrap_or_else(default_jobs).max(1),
            page_timeout: Duration::from_secs(
                self.extraction
                    .page_timeout_secs
                    .unwrap_or(DEFAULT_PAGE_TIMEOUT_SECS),
            ),
        }
    }
}
