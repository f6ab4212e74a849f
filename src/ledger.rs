// Page ledger: one record per source page, then a stable priority sort
use crate::classifier::Classification;
use crate::pdf_extraction::PageHandle;
use crate::types::LedgerError;

/// Classification outcome for one page plus the handle to copy it forward.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub original_index: usize,
    pub extracted_text: String,
    pub category: String,
    pub priority: i64,
    pub unmatched: bool,
    pub page: PageHandle,
}

impl PageRecord {
    pub fn new(page: PageHandle, extracted_text: String, classification: Classification) -> Self {
        let unmatched = classification.is_unmatched();
        Self {
            original_index: page.index(),
            extracted_text,
            category: classification.category,
            priority: classification.priority,
            unmatched,
            page,
        }
    }
}

/// One slot per source page. Workers may finish in any order; each slot
/// accepts exactly one record.
#[derive(Debug)]
pub struct PageLedger {
    slots: Vec<Option<PageRecord>>,
}

impl PageLedger {
    pub fn with_pages(page_count: usize) -> Self {
        Self {
            slots: vec![None; page_count],
        }
    }

    pub fn insert(&mut self, record: PageRecord) -> Result<(), LedgerError> {
        let capacity = self.slots.len();
        let index = record.original_index;
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(LedgerError::OutOfRange { index, capacity })?;
        if slot.is_some() {
            return Err(LedgerError::Duplicate { index });
        }
        *slot = Some(record);
        Ok(())
    }

    pub fn recorded(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Records in original page order; every page must be present.
    pub fn into_records(self) -> Result<Vec<PageRecord>, LedgerError> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(LedgerError::Missing { index }))
            .collect()
    }
}

/// Order by (priority, original_index).
///
/// Records arrive in ascending original_index, so a stable sort on priority
/// alone yields the full key order and never swaps equal-priority pages.
pub fn sort_records(mut records: Vec<PageRecord>) -> Vec<PageRecord> {
    debug_assert!(records
        .windows(2)
        .all(|w| w[0].original_index < w[1].original_index));
    records.sort_by_key(|r| r.priority);
    records
}
