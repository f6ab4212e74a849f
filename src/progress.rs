// Progress reporting toward whatever front end is driving the run
use crate::pipeline::SortReport;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Emitted once per page, after it has been classified. With parallel
/// extraction pages complete out of order; `completed` still counts up by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageProgress {
    pub completed: usize,
    pub total: usize,
    pub page_index: usize,
    pub category: String,
    pub degraded: bool,
    /// Wall time spent getting the page's text.
    pub extraction_ms: u64,
}

impl PageProgress {
    pub fn status_line(&self) -> String {
        format!("Processing page {}/{}...", self.completed, self.total)
    }
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Page(PageProgress),
    Finished(SortReport),
}

/// Fire-and-forget progress sink. Nothing a sink does can fail the run.
pub trait ProgressSink: Send + Sync {
    fn page_done(&self, progress: &PageProgress);

    fn finished(&self, _report: &SortReport) {}
}

/// Discards everything.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn page_done(&self, _progress: &PageProgress) {}
}

/// Writes progress through the log facade.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn page_done(&self, progress: &PageProgress) {
        log::debug!(
            "{} (page {} took {}ms)",
            progress.status_line(),
            progress.page_index + 1,
            progress.extraction_ms
        );
    }

    fn finished(&self, report: &SortReport) {
        match &report.output {
            Some(path) => log::info!("Completed! Saved to: {}", path.display()),
            None => log::info!("Completed! Classified {} pages", report.total_pages),
        }
    }
}

/// Forwards events to a channel; a dropped receiver is ignored.
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn page_done(&self, progress: &PageProgress) {
        let _ = self.sender.send(ProgressEvent::Page(progress.clone()));
    }

    fn finished(&self, report: &SortReport) {
        let _ = self.sender.send(ProgressEvent::Finished(report.clone()));
    }
}
