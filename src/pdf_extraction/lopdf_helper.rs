// lopdf helper - source document and lightweight page handles
use crate::types::{Result, SortError};
use lopdf::{Document, ObjectId};
use std::path::{Path, PathBuf};

/// Handle to one page of the source document. Points at the already-parsed
/// page dictionary; copying it into an output document needs no re-parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle {
    index: usize,
    object_id: ObjectId,
}

impl PageHandle {
    /// 0-based position in the source document.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based page number, as lopdf and the poppler tools count.
    pub fn page_number(&self) -> u32 {
        self.index as u32 + 1
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }
}

/// A source PDF opened once per run and never mutated afterwards.
#[derive(Debug)]
pub struct SourceDocument {
    path: PathBuf,
    document: Document,
    pages: Vec<ObjectId>,
}

impl SourceDocument {
    /// Load a PDF using lopdf
    pub fn open(path: &Path) -> Result<Self> {
        let document = Document::load(path).map_err(|source| SortError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_document(path, document)
    }

    /// Wrap an already-loaded document. `path` is only used by strategies
    /// that hand the file to an external renderer.
    ///
    /// An encrypted document is opened with the empty user password, which
    /// covers files restricted only by an owner password. Anything needing a
    /// real password is rejected.
    pub fn from_document(path: &Path, mut document: Document) -> Result<Self> {
        if document.is_encrypted() {
            document
                .decrypt("")
                .map_err(|source| SortError::Encrypted {
                    path: path.to_path_buf(),
                    source,
                })?;
            log::info!("{} opened with the empty user password", path.display());
        }
        // get_pages is keyed by 1-based page number, so values come out in page order
        let pages = document.get_pages().into_values().collect();
        Ok(Self {
            path: path.to_path_buf(),
            document,
            pages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Result<PageHandle> {
        self.pages
            .get(index)
            .map(|&object_id| PageHandle { index, object_id })
            .ok_or(SortError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
    }

    /// All pages in original order.
    pub fn pages(&self) -> impl Iterator<Item = PageHandle> + '_ {
        self.pages
            .iter()
            .enumerate()
            .map(|(index, &object_id)| PageHandle { index, object_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object};

    fn two_page_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let first = doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id });
        let second = doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![first.into(), second.into()],
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc
    }

    #[test]
    fn test_page_handles_follow_document_order() {
        let source =
            SourceDocument::from_document(Path::new("mem.pdf"), two_page_document()).unwrap();
        assert_eq!(source.page_count(), 2);
        let handles: Vec<_> = source.pages().collect();
        assert_eq!(handles[0].index(), 0);
        assert_eq!(handles[1].page_number(), 2);
        assert_eq!(source.page(1).unwrap(), handles[1]);
    }

    #[test]
    fn test_out_of_range_page_is_fatal() {
        let source =
            SourceDocument::from_document(Path::new("mem.pdf"), two_page_document()).unwrap();
        assert!(matches!(
            source.page(2),
            Err(SortError::PageOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let err = SourceDocument::open(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, SortError::Open { .. }));
    }
}
