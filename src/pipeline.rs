// Sort pipeline: open -> extract + classify every page -> sort -> assemble
use crate::assembler::assemble;
use crate::classifier::classify;
use crate::config::{RunSettings, DEFAULT_PAGE_TIMEOUT_SECS};
use crate::keyword_table::KeywordTable;
use crate::ledger::{sort_records, PageLedger, PageRecord};
use crate::pdf_extraction::{
    extract_page_text, EmbeddedText, PageText, PageTextSource, PdftoppmRasterizer,
    RecognizedText, SourceDocument, TesseractRecognizer, TextStrategy,
};
use crate::progress::{PageProgress, ProgressSink};
use crate::types::{Result, SortError};
use serde::Serialize;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How long a finished run waits on extraction threads it abandoned.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
    /// Pages extracted concurrently.
    pub jobs: usize,
    /// Per-page extraction bound; exceeding it counts as empty text.
    pub page_timeout: Duration,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub priority: i64,
    pub pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedPage {
    pub original_index: usize,
    pub category: String,
    pub priority: i64,
}

/// Summary of one run. `order` lists pages in output order.
#[derive(Debug, Clone, Serialize)]
pub struct SortReport {
    pub output: Option<PathBuf>,
    pub table: String,
    pub total_pages: usize,
    pub unmatched_pages: usize,
    pub degraded_pages: usize,
    pub per_category: Vec<CategoryCount>,
    pub order: Vec<OrderedPage>,
}

impl SortReport {
    fn from_sorted(table: &KeywordTable, records: &[PageRecord], degraded_pages: usize) -> Self {
        let mut per_category: Vec<CategoryCount> = Vec::new();
        for record in records {
            match per_category.iter_mut().find(|c| c.category == record.category) {
                Some(count) => count.pages += 1,
                None => per_category.push(CategoryCount {
                    category: record.category.clone(),
                    priority: record.priority,
                    pages: 1,
                }),
            }
        }

        Self {
            output: None,
            table: table.name().to_string(),
            total_pages: records.len(),
            unmatched_pages: records.iter().filter(|r| r.unmatched).count(),
            degraded_pages,
            per_category,
            order: records
                .iter()
                .map(|r| OrderedPage {
                    original_index: r.original_index,
                    category: r.category.clone(),
                    priority: r.priority,
                })
                .collect(),
        }
    }
}

/// Everything one run needs, passed in explicitly.
pub struct SortJob {
    table: Arc<KeywordTable>,
    text_source: Arc<dyn PageTextSource>,
    options: SortOptions,
}

impl SortJob {
    pub fn new(table: KeywordTable, text_source: Arc<dyn PageTextSource>) -> Self {
        Self {
            table: Arc::new(table),
            text_source,
            options: SortOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SortOptions) -> Self {
        self.options = options;
        self
    }

    /// Load the table and construct the extraction engine named by `settings`.
    /// Engine construction happens here, once, before any page is touched.
    pub fn from_settings(settings: &RunSettings) -> Result<Self> {
        let mut table = KeywordTable::load(&settings.table)?;
        if let Some(mode) = settings.match_mode {
            table = table.with_match_mode(mode);
        }

        let text_source: Arc<dyn PageTextSource> = match settings.strategy {
            TextStrategy::Embedded => Arc::new(EmbeddedText),
            TextStrategy::Ocr => {
                let rasterizer = PdftoppmRasterizer::new().with_time_limit(settings.page_timeout);
                rasterizer
                    .probe()
                    .map_err(|e| SortError::Engine(format!("{:#}", e)))?;
                let recognizer = TesseractRecognizer::new(&settings.language)
                    .map_err(|e| SortError::Engine(format!("{:#}", e)))?
                    .with_time_limit(settings.page_timeout);
                Arc::new(RecognizedText::new(
                    Box::new(rasterizer),
                    Box::new(recognizer),
                    settings.scale,
                ))
            }
        };

        Ok(Self::new(table, text_source).with_options(SortOptions {
            jobs: settings.jobs,
            page_timeout: settings.page_timeout,
        }))
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Sort `input` into `output`.
    pub async fn run(
        &self,
        input: &Path,
        output: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<SortReport> {
        let source = open_source(input).await?;
        let (records, degraded) = self.classify_pages(source.clone(), progress).await?;
        let sorted = sort_records(records);

        let mut report = SortReport::from_sorted(&self.table, &sorted, degraded);
        let destination = output.to_path_buf();
        tokio::task::spawn_blocking(move || assemble(&source, &sorted, &destination))
            .await
            .map_err(|e| SortError::Worker(e.to_string()))??;

        report.output = Some(output.to_path_buf());
        progress.finished(&report);
        Ok(report)
    }

    /// Classify and order `input` without writing anything.
    pub async fn plan(&self, input: &Path, progress: &dyn ProgressSink) -> Result<SortReport> {
        let source = open_source(input).await?;
        let (records, degraded) = self.classify_pages(source, progress).await?;
        let report = SortReport::from_sorted(&self.table, &sort_records(records), degraded);
        progress.finished(&report);
        Ok(report)
    }

    /// Extract and classify every page of an opened document. Returns the
    /// ledger contents in original page order plus the degraded-page count.
    pub async fn classify_pages(
        &self,
        source: Arc<SourceDocument>,
        progress: &dyn ProgressSink,
    ) -> Result<(Vec<PageRecord>, usize)> {
        let total = source.page_count();
        log::info!("Total Pages: {}", total);

        let semaphore = Arc::new(Semaphore::new(self.options.jobs.max(1)));
        let timeout = self.options.page_timeout;
        let mut tasks = JoinSet::new();

        for page in source.pages() {
            let semaphore = semaphore.clone();
            let source = source.clone();
            let text_source = self.text_source.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let work = tokio::task::spawn_blocking(move || {
                    extract_page_text(text_source.as_ref(), &source, page)
                });
                let page_text = match tokio::time::timeout(timeout, work).await {
                    Ok(Ok(page_text)) => page_text,
                    Ok(Err(e)) => {
                        log::warn!("[Page {}] extraction task failed: {}", page.page_number(), e);
                        PageText::degraded(e.to_string())
                    }
                    Err(_) => {
                        log::warn!(
                            "[Page {}] extraction timed out after {:?}",
                            page.page_number(),
                            timeout
                        );
                        PageText {
                            extraction_time_ms: timeout.as_millis() as u64,
                            ..PageText::degraded(format!("timed out after {:?}", timeout))
                        }
                    }
                };
                (page, page_text)
            });
        }

        let mut ledger = PageLedger::with_pages(total);
        let mut completed = 0;
        let mut degraded = 0;
        while let Some(joined) = tasks.join_next().await {
            let (page, page_text) = joined.map_err(|e| SortError::Worker(e.to_string()))?;
            let classification = classify(&page_text.text, &self.table);
            log::info!("[Page {}] Category: {}", page.page_number(), classification.category);

            completed += 1;
            if page_text.degraded.is_some() {
                degraded += 1;
            }
            progress.page_done(&PageProgress {
                completed,
                total,
                page_index: page.index(),
                category: classification.category.clone(),
                degraded: page_text.degraded.is_some(),
                extraction_ms: page_text.extraction_time_ms,
            });
            ledger.insert(PageRecord::new(page, page_text.text, classification))?;
        }

        Ok((ledger.into_records()?, degraded))
    }
}

/// Drive `future` on a fresh multi-threaded runtime, then shut the runtime
/// down without waiting more than `SHUTDOWN_GRACE` on blocking work. A page
/// extraction abandoned by the page timeout cannot keep the process alive.
pub fn block_on<F: Future>(future: F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}

async fn open_source(input: &Path) -> Result<Arc<SourceDocument>> {
    let path = input.to_path_buf();
    let source = tokio::task::spawn_blocking(move || SourceDocument::open(&path))
        .await
        .map_err(|e| SortError::Worker(e.to_string()))??;
    Ok(Arc::new(source))
}
