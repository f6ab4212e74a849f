// Text strategy routing - picks how a page's text signal is obtained
//
// Two strategies exist: the embedded text layer (fast, empty for image-only
// labels) and render + OCR. Both sit behind PageTextSource so the classifier
// and everything downstream never know which one ran.

use super::lopdf_helper::{PageHandle, SourceDocument};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Text acquisition strategy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TextStrategy {
    /// Embedded text layer via lopdf
    #[default]
    Embedded,
    /// Render with pdftoppm, recognize with tesseract
    Ocr,
}

/// Something that turns a page into a best-effort text signal.
///
/// Errors are allowed and expected (broken fonts, OCR crashes); the
/// extractor absorbs them as empty text for that page only.
pub trait PageTextSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn page_text(&self, source: &SourceDocument, page: PageHandle) -> Result<String>;
}

/// Outcome of extracting one page.
#[derive(Debug, Clone)]
pub struct PageText {
    pub text: String,
    /// Set when the strategy failed and the text was replaced by "".
    pub degraded: Option<String>,
    /// Reported with the page's progress event.
    pub extraction_time_ms: u64,
}

impl PageText {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            degraded: Some(reason.into()),
            extraction_time_ms: 0,
        }
    }
}

/// Run a strategy on one page, converting failures into empty text.
pub fn extract_page_text(
    text_source: &dyn PageTextSource,
    source: &SourceDocument,
    page: PageHandle,
) -> PageText {
    let start = Instant::now();
    let result = text_source.page_text(source, page);
    let extraction_time_ms = start.elapsed().as_millis() as u64;
    log::debug!(
        "{} extraction of page {} took {}ms",
        text_source.name(),
        page.page_number(),
        extraction_time_ms
    );

    match result {
        Ok(text) => PageText {
            text,
            degraded: None,
            extraction_time_ms,
        },
        Err(e) => {
            log::warn!(
                "[Page {}] {} extraction failed, treating as empty: {:#}",
                page.page_number(),
                text_source.name(),
                e
            );
            PageText {
                text: String::new(),
                degraded: Some(format!("{:#}", e)),
                extraction_time_ms,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object};
    use std::path::Path;

    struct Failing;

    impl PageTextSource for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn page_text(&self, _source: &SourceDocument, _page: PageHandle) -> Result<String> {
            anyhow::bail!("engine crashed")
        }
    }

    fn one_page() -> SourceDocument {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page = doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page.into()],
                "Count" => 1,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        SourceDocument::from_document(Path::new("mem.pdf"), doc).unwrap()
    }

    #[test]
    fn test_failure_degrades_to_empty_text() {
        let source = one_page();
        let page = source.page(0).unwrap();
        let result = extract_page_text(&Failing, &source, page);
        assert_eq!(result.text, "");
        assert!(result.degraded.unwrap().contains("engine crashed"));
    }

    #[test]
    fn test_default_strategy_is_embedded() {
        assert_eq!(TextStrategy::default(), TextStrategy::Embedded);
    }
}
