// Embedded text layer extraction through lopdf
use super::extraction_router::PageTextSource;
use super::lopdf_helper::{PageHandle, SourceDocument};
use anyhow::{Context, Result};

/// Reads the page's own text layer. Image-only labels give "".
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedText;

impl PageTextSource for EmbeddedText {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn page_text(&self, source: &SourceDocument, page: PageHandle) -> Result<String> {
        source
            .document()
            .extract_text(&[page.page_number()])
            .with_context(|| format!("reading text layer of page {}", page.page_number()))
    }
}
