// label-sorter: regroup shipment-label PDF pages by courier or product model
pub mod assembler;
pub mod classifier;
pub mod config;
pub mod keyword_table;
pub mod ledger;
pub mod pdf_extraction;
pub mod pipeline;
pub mod progress;
pub mod types;

pub use classifier::{classify, Classification};
pub use keyword_table::{KeywordTable, MatchMode};
pub use ledger::{sort_records, PageLedger, PageRecord};
pub use pipeline::{SortJob, SortOptions, SortReport};
pub use types::{LedgerError, Result, SortError, TableError};
