// Document assembler - writes the sorted pages into a new PDF
use crate::ledger::PageRecord;
use crate::pdf_extraction::{PageHandle, SourceDocument};
use crate::types::{Result, SortError};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

// Guards against a Parent cycle in a malformed page tree.
const MAX_TREE_DEPTH: usize = 64;

/// Output document under construction.
///
/// Starts as a copy of the source object graph with an empty page tree.
/// Pages are re-attached as direct kids of the root Pages node in append
/// order; their dictionaries and content streams are the source objects,
/// so nothing is re-rendered.
pub struct OutputDocument<'a> {
    source: &'a SourceDocument,
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    appended: HashSet<ObjectId>,
}

impl<'a> OutputDocument<'a> {
    pub fn from_source(source: &'a SourceDocument) -> Result<Self> {
        let mut document = source.document().clone();
        let pages_id = root_pages_id(&document)?;
        let root = dictionary_mut(&mut document, pages_id)?;
        root.set("Kids", Vec::<Object>::new());
        root.set("Count", 0);

        Ok(Self {
            source,
            document,
            pages_id,
            kids: Vec::with_capacity(source.page_count()),
            appended: HashSet::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn append(&mut self, page: PageHandle) -> Result<()> {
        if self.source.page(page.index())? != page {
            return Err(SortError::Assembly(format!(
                "page handle {:?} does not belong to {}",
                page.object_id(),
                self.source.path().display()
            )));
        }
        if !self.appended.insert(page.object_id()) {
            return Err(SortError::Assembly(format!(
                "page {} appended twice",
                page.page_number()
            )));
        }

        let inherited = inherited_attributes(self.source.document(), page.object_id())?;
        let dict = dictionary_mut(&mut self.document, page.object_id())?;
        for (key, value) in inherited {
            dict.set(key, value);
        }
        dict.set("Parent", self.pages_id);
        self.kids.push(page.object_id());
        Ok(())
    }

    /// Write atomically: serialize to a temp file beside `destination`, then
    /// rename over it. On failure nothing is left at `destination`.
    pub fn save(mut self, destination: &Path) -> Result<usize> {
        let count = self.kids.len();
        let kids: Vec<Object> = self.kids.iter().map(|&id| id.into()).collect();
        let root = dictionary_mut(&mut self.document, self.pages_id)?;
        root.set("Kids", kids);
        root.set("Count", count as i64);

        // Intermediate Pages nodes are unreferenced now
        let pruned = self.document.prune_objects();
        log::debug!("pruned {} unreferenced objects", pruned.len());

        let write_err = |source: io::Error| SortError::Write {
            path: destination.to_path_buf(),
            source,
        };
        let dir = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp = temp_file_in(dir, destination).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(&mut temp);
            self.document
                .save_to(&mut writer)
                .map_err(|e| write_err(io::Error::other(e.to_string())))?;
            writer.flush().map_err(write_err)?;
        }
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(destination).map_err(|e| write_err(e.error))?;
        Ok(count)
    }
}

/// Temp file for an atomic write over `destination`. Takes the mode of the
/// file being replaced, or 0666 less the umask for a new file, like a plain
/// create would.
#[cfg(unix)]
fn temp_file_in(dir: &Path, destination: &Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    let existing = fs::metadata(destination)
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.permissions());
    let temp = Builder::new()
        .prefix(".label-sorter")
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)?;
    if let Some(permissions) = existing {
        // creation applied the umask; a replaced file keeps its exact mode
        temp.as_file().set_permissions(permissions)?;
    }
    Ok(temp)
}

#[cfg(not(unix))]
fn temp_file_in(dir: &Path, _destination: &Path) -> io::Result<NamedTempFile> {
    Builder::new().prefix(".label-sorter").tempfile_in(dir)
}

/// Build and persist the output document from records already in output order.
pub fn assemble(
    source: &SourceDocument,
    records: &[PageRecord],
    destination: &Path,
) -> Result<usize> {
    let mut output = OutputDocument::from_source(source)?;
    for record in records {
        output.append(record.page)?;
    }
    let written = output.save(destination)?;
    log::info!("wrote {} pages to {}", written, destination.display());
    Ok(written)
}

fn root_pages_id(document: &Document) -> Result<ObjectId> {
    let lookup = || -> lopdf::Result<ObjectId> {
        let root = document.trailer.get(b"Root")?.as_reference()?;
        document.get_object(root)?.as_dict()?.get(b"Pages")?.as_reference()
    };
    lookup().map_err(|e| SortError::Assembly(format!("document has no page tree: {}", e)))
}

fn dictionary_mut(document: &mut Document, id: ObjectId) -> Result<&mut Dictionary> {
    document
        .get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| SortError::Assembly(format!("object {:?} is not a dictionary: {}", id, e)))
}

/// Attributes the page lacks but inherits from an ancestor, nearest wins.
fn inherited_attributes(
    document: &Document,
    page_id: ObjectId,
) -> Result<Vec<(&'static [u8], Object)>> {
    let page = document
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| SortError::Assembly(format!("page {:?} unreadable: {}", page_id, e)))?;

    let mut missing: Vec<&'static [u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|k| !page.has(k))
        .collect();
    let mut found = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = document.get_object(node_id).and_then(Object::as_dict) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((*key, value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
    Ok(found)
}
