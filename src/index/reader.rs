//! Read-only index handle.

use std::sync::Arc;

use crate::analysis::property::AnalysisProperty;
use crate::document::{Document, DocumentId, DocumentSequence};
use crate::error::{Result, TesseraError};
use crate::index::shared::IndexShared;
use crate::index::term::{Term, TermId};
use crate::index::{DocumentState, IndexConfig, IndexMetadata, IndexType, persist};
use crate::search::{Search, SearchOptions};
use crate::storage::Storage;
use crate::storage::memory::MemoryStorage;

/// A read-only view of an index.
///
/// Counts, postings lookups and searches reflect the last committed
/// generation. Dropping the handle closes the index; documents and terms
/// obtained from it then fail with [`TesseraError::IndexClosed`].
#[derive(Debug)]
pub struct Index {
    pub(crate) shared: Arc<IndexShared>,
}

impl Index {
    pub(crate) fn from_shared(shared: Arc<IndexShared>) -> Self {
        Index { shared }
    }

    /// Open an existing index read-only.
    pub fn open(storage: Arc<dyn Storage>, name: &str) -> Result<Self> {
        Ok(Index::from_shared(IndexShared::open(storage, name, false)?))
    }

    /// Open a read-only index from snapshot bytes produced by
    /// [`to_bytes`](Index::to_bytes).
    pub fn open_from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let (storage, name) = storage_from_bytes(bytes)?;
        Self::open(storage, &name)
    }

    /// Close the index. Later calls fail with [`TesseraError::IndexClosed`].
    pub fn close(&self) -> Result<()> {
        self.shared.mark_closed();
        Ok(())
    }

    /// Whether the index has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// The index name.
    pub fn name(&self) -> &str {
        &self.shared.metadata().name
    }

    /// Creation metadata.
    pub fn metadata(&self) -> &IndexMetadata {
        self.shared.metadata()
    }

    /// The index type.
    pub fn index_type(&self) -> IndexType {
        self.shared.index_type()
    }

    /// The configuration the index was created with.
    pub fn config(&self) -> &IndexConfig {
        &self.shared.metadata().config
    }

    /// The analysis properties the index was created with.
    pub fn analysis_properties(&self) -> &[AnalysisProperty] {
        &self.shared.metadata().config.analysis
    }

    /// The storage backend.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        self.shared.storage()
    }

    /// Number of committed documents.
    pub fn document_count(&self) -> Result<usize> {
        Ok(self.shared.snapshot()?.document_count())
    }

    /// Highest document ID allocated as of the last flush (0 when none).
    pub fn max_document_id(&self) -> Result<DocumentId> {
        Ok(self.shared.snapshot()?.max_document_id())
    }

    /// Highest term ID ever allocated as of the last flush (0 when none).
    pub fn max_term_id(&self) -> Result<TermId> {
        Ok(self.shared.snapshot()?.dictionary().max_term_id())
    }

    /// Look up a document by ID.
    pub fn document(&self, id: DocumentId) -> Result<Document> {
        self.shared.document_by_id(id, true)
    }

    /// The indexing state of a document.
    pub fn document_state(&self, document: &Document) -> Result<DocumentState> {
        self.shared.document_state(document)
    }

    /// Root documents, in ID order.
    pub fn roots(&self) -> Result<DocumentSequence> {
        self.shared.roots()
    }

    /// Children of a document, in ID order.
    pub fn children(&self, document: &Document) -> Result<DocumentSequence> {
        let id = self.require_id(document)?;
        self.shared.children(id, true)
    }

    /// The property bag of a document.
    pub fn properties(&self, document: &Document) -> Result<Option<serde_json::Value>> {
        let id = self.require_id(document)?;
        self.shared.properties(id)
    }

    /// Look up a term by its exact string. The term is invalid when the
    /// string has never been indexed.
    pub fn term(&self, text: &str) -> Result<Term> {
        let id = self.shared.snapshot()?.dictionary().id_for_term(text);
        Ok(Term::new(&self.shared, id, Some(text.to_string())))
    }

    /// Look up a term by ID.
    pub fn term_for_id(&self, id: TermId) -> Result<Term> {
        let text = self.shared.snapshot()?.dictionary().string_for_id(id)?;
        Ok(Term::new(&self.shared, id, Some(text.to_string())))
    }

    /// How many times `term` occurs in `document`.
    pub fn number_of_occurrences(&self, document: &Document, term: &Term) -> Result<u32> {
        let term_id = self.term_id(term)?;
        let id = self.require_id(document)?;
        Ok(self
            .shared
            .snapshot()?
            .vector(id)
            .map_or(0, |vector| vector.term_freq(term_id)))
    }

    /// Number of distinct terms in `document`.
    pub fn term_count(&self, document: &Document) -> Result<usize> {
        let id = self.require_id(document)?;
        Ok(self
            .shared
            .snapshot()?
            .vector(id)
            .map_or(0, |vector| vector.distinct_terms()))
    }

    /// Number of committed documents containing `term`.
    pub fn number_of_documents_containing(&self, term: &Term) -> Result<u32> {
        let term_id = self.term_id(term)?;
        self.shared.snapshot()?.dictionary().document_frequency(term_id)
    }

    /// Documents containing `term`, ascending. Needs an inverted index.
    pub fn documents_containing(&self, term: &Term) -> Result<Vec<DocumentId>> {
        if !self.index_type().supports_inverted() {
            return Err(TesseraError::unsupported(format!(
                "{:?} index keeps no postings lists",
                self.index_type()
            )));
        }

        let term_id = self.term_id(term)?;
        Ok(self
            .shared
            .snapshot()?
            .postings(term_id)
            .map(|list| list.iter().map(|posting| posting.doc_id).collect())
            .unwrap_or_default())
    }

    /// `(term, frequency)` pairs of a document, by term ID.
    pub fn terms_for_document(&self, document: &Document) -> Result<Vec<(TermId, u32)>> {
        let id = self.require_id(document)?;
        Ok(self
            .shared
            .snapshot()?
            .vector(id)
            .map(|vector| vector.frequencies())
            .unwrap_or_default())
    }

    /// Start a search over the committed generation.
    pub fn search(&self, query: &str, options: SearchOptions) -> Result<Search> {
        Search::new(&self.shared, query, options)
    }

    /// Serialize the committed state.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.shared.to_bytes()
    }

    fn require_id(&self, document: &Document) -> Result<DocumentId> {
        self.shared.document_id(document)?.ok_or_else(|| {
            TesseraError::not_indexed(format!("document {} is unknown to this index", document))
        })
    }

    fn term_id(&self, term: &Term) -> Result<TermId> {
        if !term.belongs_to(&self.shared) {
            return Err(TesseraError::invalid_argument(
                "term belongs to another index",
            ));
        }
        term.lookup_id()
    }
}

/// Wrap snapshot bytes in a memory storage, returning it with the index name.
pub(crate) fn storage_from_bytes(bytes: Vec<u8>) -> Result<(Arc<dyn Storage>, String)> {
    let name = persist::decode(&bytes)?.metadata.name;
    let storage = MemoryStorage::from_bytes(&persist::snapshot_file(&name), bytes);
    Ok((Arc::new(storage), name))
}
