// Core types and error taxonomy for label-sorter
use std::path::PathBuf;

/// Run-level failures. Anything in here aborts the run; page-level
/// extraction problems never reach this type, they degrade to empty text.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("cannot open PDF {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("PDF {path} needs a password to open: {source}")]
    Encrypted {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("page index {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("keyword table error: {0}")]
    Table(#[from] TableError),

    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction engine unavailable: {0}")]
    Engine(String),

    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Problems with a keyword table definition.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("cannot read table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid table TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown built-in table '{0}'")]
    UnknownBuiltin(String),

    #[error("duplicate category '{0}'")]
    DuplicateCategory(String),

    #[error("category '{0}' uses the fallback name")]
    ReservedName(String),

    #[error("category '{0}' has an empty keyword")]
    EmptyKeyword(String),

    #[error("fallback priority {fallback} must exceed '{category}' priority {priority}")]
    FallbackNotLast {
        fallback: i64,
        category: String,
        priority: i64,
    },

    #[error("invalid keyword pattern '{keyword}': {source}")]
    Pattern {
        keyword: String,
        #[source]
        source: regex::Error,
    },
}

/// Violations of the one-record-per-page rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("page {index} recorded twice")]
    Duplicate { index: usize },

    #[error("page {index} outside ledger of {capacity} pages")]
    OutOfRange { index: usize, capacity: usize },

    #[error("page {index} was never recorded")]
    Missing { index: usize },
}

pub type Result<T> = std::result::Result<T, SortError>;
