//! Writable index handle.

use std::ops::Deref;
use std::sync::Arc;

use crate::document::{Document, DocumentId};
use crate::error::{Result, TesseraError};
use crate::index::reader::{Index, storage_from_bytes};
use crate::index::shared::IndexShared;
use crate::index::{IndexConfig, IndexMetadata};
use crate::storage::Storage;
use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

/// An index that accepts mutations.
///
/// Dereferences to [`Index`] for every read operation. Documents obtained
/// from a writable index are mutable-bound.
#[derive(Debug)]
pub struct WritableIndex {
    index: Index,
}

impl WritableIndex {
    /// Create a new index named `name` in `storage`.
    ///
    /// Fails when the storage already holds an index of that name.
    pub fn create(storage: Arc<dyn Storage>, name: &str, config: IndexConfig) -> Result<Self> {
        let metadata = IndexMetadata::new(name, config);
        Ok(WritableIndex {
            index: Index::from_shared(IndexShared::create(storage, metadata)?),
        })
    }

    /// Create a new index backed by fresh memory storage.
    pub fn create_in_memory(name: &str, config: IndexConfig) -> Result<Self> {
        let storage = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
        Self::create(storage, name, config)
    }

    /// Open an existing index for writing.
    pub fn open(storage: Arc<dyn Storage>, name: &str) -> Result<Self> {
        Ok(WritableIndex {
            index: Index::from_shared(IndexShared::open(storage, name, true)?),
        })
    }

    /// Open a writable index from snapshot bytes. Later flushes go to a
    /// private memory storage.
    pub fn open_from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let (storage, name) = storage_from_bytes(bytes)?;
        Self::open(storage, &name)
    }

    /// Flush pending changes and close the index.
    ///
    /// The index stays open when the flush fails.
    pub fn close(&self) -> Result<()> {
        if self.shared.is_closed() {
            return Ok(());
        }
        self.shared.flush()?;
        self.shared.mark_closed();
        Ok(())
    }

    /// Index `text` for a document that has no postings yet.
    ///
    /// Fails with [`TesseraError::AlreadyIndexed`] when the document is
    /// indexed or pending indexing.
    pub fn add(&self, document: &Document, text: &str) -> Result<DocumentId> {
        self.add_with_overwrite(document, text, false)
    }

    /// Index `text` for a document, replacing any earlier postings.
    pub fn update(&self, document: &Document, text: &str) -> Result<DocumentId> {
        self.add_with_overwrite(document, text, true)
    }

    /// Index `text` for a document. The document and its ancestors are
    /// registered in the tree as needed. Postings become visible at the next
    /// flush.
    pub fn add_with_overwrite(
        &self,
        document: &Document,
        text: &str,
        overwrite: bool,
    ) -> Result<DocumentId> {
        self.shared.add_document(document, text, overwrite)
    }

    /// Register a document in the tree without indexing any text.
    ///
    /// Registration is idempotent on identity. Returns the mutable-bound
    /// document.
    pub fn register(&self, document: &Document) -> Result<Document> {
        self.shared.register(document)
    }

    /// Remove a document. Its children become roots and its postings are
    /// dropped at the next flush.
    pub fn remove(&self, document: &Document) -> Result<()> {
        let id = self.known_id(document)?;
        self.shared.remove_document(id)
    }

    /// Rename a document.
    pub fn rename(&self, document: &Document, new_name: &str) -> Result<()> {
        let id = self.known_id(document)?;
        self.shared.rename_document(id, new_name)
    }

    /// Move a document under `new_parent`, or to the root with `None`.
    pub fn move_document(&self, document: &Document, new_parent: Option<&Document>) -> Result<()> {
        let id = self.known_id(document)?;
        self.shared.move_document(id, new_parent)
    }

    /// Replace the property bag of a document.
    pub fn set_properties(
        &self,
        document: &Document,
        properties: Option<serde_json::Value>,
    ) -> Result<()> {
        let id = self.known_id(document)?;
        self.shared.set_properties(id, properties)
    }

    /// Commit buffered changes. A no-op when nothing is pending.
    ///
    /// On failure the committed state and the pending changes are left as
    /// they were.
    pub fn flush(&self) -> Result<()> {
        self.shared.flush()
    }

    /// Flush, then drop unused terms and shrink postings storage.
    ///
    /// Query results are unchanged. Searches already running keep the
    /// generation they started with.
    pub fn compact(&self) -> Result<()> {
        self.shared.compact()
    }

    /// Number of buffered document changes.
    pub fn pending_changes(&self) -> usize {
        self.shared.pending_count()
    }

    fn known_id(&self, document: &Document) -> Result<DocumentId> {
        self.shared.document_id(document)?.ok_or_else(|| {
            TesseraError::not_indexed(format!("document {} is unknown to this index", document))
        })
    }
}

impl Deref for WritableIndex {
    type Target = Index;

    fn deref(&self) -> &Index {
        &self.index
    }
}

impl Drop for WritableIndex {
    fn drop(&mut self) {
        if self.shared.is_closed() {
            return;
        }
        let pending = self.shared.pending_count();
        if pending > 0 {
            log::warn!(
                "Dropping index {} with {pending} unflushed document changes",
                self.name()
            );
        }
        self.shared.mark_closed();
    }
}
