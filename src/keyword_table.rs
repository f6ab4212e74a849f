// Keyword tables: category -> keyword variants + priority, loaded from TOML
use crate::types::TableError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Built-in tables compiled into the binary, in listing order.
pub const BUILTIN_TABLES: &[(&str, &str)] = &[
    ("couriers", include_str!("../tables/couriers.toml")),
    ("models", include_str!("../tables/models.toml")),
];

pub const DEFAULT_FALLBACK: &str = "UNMATCHED";
pub const DEFAULT_FALLBACK_PRIORITY: i64 = 999;

/// How keywords are matched against normalized page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// First category (in table order) with any keyword as a plain substring.
    /// A short keyword like "XPRESS" also fires inside longer tokens; that is
    /// the reference behaviour and stays the default.
    #[default]
    First,
    /// Like `First`, but the keyword must start and end on a word boundary.
    Word,
    /// Longest matching keyword across the whole table; ties go to table order.
    Longest,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct TableFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default = "default_fallback")]
    fallback: String,
    #[serde(default = "default_fallback_priority")]
    fallback_priority: i64,
    #[serde(default)]
    match_mode: MatchMode,
    #[serde(default, rename = "category")]
    categories: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct CategoryEntry {
    name: String,
    priority: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    keywords: Vec<String>,
}

fn default_fallback() -> String {
    DEFAULT_FALLBACK.to_string()
}

fn default_fallback_priority() -> i64 {
    DEFAULT_FALLBACK_PRIORITY
}

/// One real category. Keywords are stored upper-cased, in authored order.
#[derive(Debug, Clone)]
pub struct Category {
    name: String,
    priority: i64,
    keywords: Vec<String>,
    word_patterns: Vec<Regex>,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub(crate) fn word_patterns(&self) -> &[Regex] {
        &self.word_patterns
    }
}

/// Immutable classification table. Built once, shared read-only for a run.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    name: String,
    categories: Vec<Category>,
    fallback: String,
    fallback_priority: i64,
    match_mode: MatchMode,
}

impl KeywordTable {
    /// Parse and validate a table from TOML text.
    pub fn from_toml(name: &str, content: &str) -> Result<Self, TableError> {
        let file: TableFile = toml::from_str(content)?;
        Self::from_file(name, file)
    }

    /// Load a built-in table by name, or a TOML file if `source` is not one.
    pub fn load(source: &str) -> Result<Self, TableError> {
        if let Some(content) = builtin_source(source) {
            return Self::from_toml(source, content);
        }
        let path = Path::new(source);
        if !path.exists() && !source.contains(['/', '\\', '.']) {
            return Err(TableError::UnknownBuiltin(source.to_string()));
        }
        Self::load_file(path)
    }

    pub fn load_file(path: &Path) -> Result<Self, TableError> {
        let content = fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".to_string());
        Self::from_toml(&stem, &content)
    }

    pub fn builtin(name: &str) -> Result<Self, TableError> {
        let content =
            builtin_source(name).ok_or_else(|| TableError::UnknownBuiltin(name.to_string()))?;
        Self::from_toml(name, content)
    }

    fn from_file(default_name: &str, file: TableFile) -> Result<Self, TableError> {
        let fallback = file.fallback.trim().to_uppercase();
        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(file.categories.len());

        for entry in file.categories {
            let name = entry.name.trim().to_string();
            if name.to_uppercase() == fallback {
                return Err(TableError::ReservedName(name));
            }
            if !seen.insert(name.clone()) {
                return Err(TableError::DuplicateCategory(name));
            }
            if entry.priority >= file.fallback_priority {
                return Err(TableError::FallbackNotLast {
                    fallback: file.fallback_priority,
                    category: name,
                    priority: entry.priority,
                });
            }

            // A model table names its categories after the keyword itself.
            let raw = if entry.keywords.is_empty() {
                vec![name.clone()]
            } else {
                entry.keywords
            };

            let mut keywords = Vec::with_capacity(raw.len());
            let mut word_patterns = Vec::with_capacity(raw.len());
            for keyword in raw {
                let keyword = keyword.trim().to_uppercase();
                if keyword.is_empty() {
                    return Err(TableError::EmptyKeyword(name));
                }
                word_patterns.push(word_pattern(&keyword)?);
                keywords.push(keyword);
            }

            categories.push(Category {
                name,
                priority: entry.priority,
                keywords,
                word_patterns,
            });
        }

        Ok(Self {
            name: file.name.unwrap_or_else(|| default_name.to_string()),
            categories,
            fallback,
            fallback_priority: file.fallback_priority,
            match_mode: file.match_mode,
        })
    }

    /// Same table with a different match mode.
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Categories in table order; this order decides first-match-wins.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn fallback_priority(&self) -> i64 {
        self.fallback_priority
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Priority for a category name; unknown names get the fallback priority.
    pub fn priority_of(&self, category: &str) -> i64 {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.priority)
            .unwrap_or(self.fallback_priority)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let file = TableFile {
            name: Some(self.name.clone()),
            fallback: self.fallback.clone(),
            fallback_priority: self.fallback_priority,
            match_mode: self.match_mode,
            categories: self
                .categories
                .iter()
                .map(|c| CategoryEntry {
                    name: c.name.clone(),
                    priority: c.priority,
                    keywords: c.keywords.clone(),
                })
                .collect(),
        };
        toml::to_string_pretty(&file)
    }
}

fn builtin_source(name: &str) -> Option<&'static str> {
    BUILTIN_TABLES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, content)| *content)
}

// \b only makes sense next to a word character.
fn word_pattern(keyword: &str) -> Result<Regex, TableError> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if keyword.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let trail = if keyword.chars().last().is_some_and(is_word) { r"\b" } else { "" };
    Regex::new(&format!("{lead}{}{trail}", regex::escape(keyword))).map_err(|source| {
        TableError::Pattern {
            keyword: keyword.to_string(),
            source,
        }
    })
}
