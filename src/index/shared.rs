//! State shared between an index handle and everything derived from it.
//!
//! [`IndexShared`] lives behind an `Arc`. The public [`Index`](super::Index)
//! and [`WritableIndex`](super::WritableIndex) handles own the strong
//! reference; documents, terms, sequences and searches hold `Weak` ones and
//! fail with [`TesseraError::IndexClosed`] once the handle is gone.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::analysis::analyzer::{Analyzer, PipelineAnalyzer};
use crate::analysis::property::AnalysisSettings;
use crate::analysis::token::Token;
use crate::document::store::IdentityKey;
use crate::document::{
    Binding, Document, DocumentId, DocumentSequence, DocumentStore, Identity, IndexRef,
    NodeIdentity,
};
use crate::error::{Result, TesseraError};
use crate::index::dictionary::TermDictionary;
use crate::index::generation::{Generation, PendingChange};
use crate::index::persist;
use crate::index::posting::TermVector;
use crate::index::term::TermId;
use crate::index::{DocumentState, IndexMetadata, IndexType};
use crate::storage::Storage;

/// The writer's working state plus the committed generation.
#[derive(Debug)]
struct IndexState {
    /// Working dictionary; new terms are allocated here immediately.
    dictionary: Arc<TermDictionary>,
    store: DocumentStore,
    pending: BTreeMap<DocumentId, PendingChange>,
    /// Identities of committed documents removed from the tree since the
    /// last commit, so they still report `DeletePending`.
    detached: AHashMap<IdentityKey, DocumentId>,
    /// Set when the tree changed since the last snapshot.
    tree_dirty: bool,
    committed: Arc<Generation>,
}

impl IndexState {
    fn document_state(&self, id: DocumentId) -> DocumentState {
        let committed = self.committed.contains_document(id);
        match self.pending.get(&id) {
            Some(PendingChange::Add(_)) => DocumentState::AddPending,
            Some(PendingChange::Remove) if committed => DocumentState::DeletePending,
            Some(PendingChange::Remove) => DocumentState::NotIndexed,
            None if committed => DocumentState::Indexed,
            None => DocumentState::NotIndexed,
        }
    }
}

#[derive(Debug)]
pub(crate) struct IndexShared {
    metadata: IndexMetadata,
    settings: AnalysisSettings,
    analyzer: PipelineAnalyzer,
    storage: Arc<dyn Storage>,
    writable: bool,
    closed: AtomicBool,
    state: RwLock<IndexState>,
}

impl IndexShared {
    /// Create a new, empty index and write its first snapshot.
    pub(crate) fn create(storage: Arc<dyn Storage>, metadata: IndexMetadata) -> Result<Arc<Self>> {
        if metadata.name.is_empty() {
            return Err(TesseraError::invalid_argument("index name is empty"));
        }
        if storage.file_exists(&persist::snapshot_file(&metadata.name)) {
            return Err(TesseraError::invalid_argument(format!(
                "index {} already exists",
                metadata.name
            )));
        }

        let shared = Self::from_parts(
            storage,
            metadata,
            Generation::default(),
            DocumentStore::new(),
            true,
        );
        {
            let state = shared.state.read();
            shared.persist(&state.committed, &state.store)?;
        }

        log::info!(
            "Created {:?} index {} ({})",
            shared.metadata.config.index_type,
            shared.metadata.name,
            shared.metadata.uuid
        );
        Ok(shared)
    }

    /// Load the last snapshot of an index.
    pub(crate) fn open(storage: Arc<dyn Storage>, name: &str, writable: bool) -> Result<Arc<Self>> {
        let bytes = persist::read(storage.as_ref(), name)?;
        let snapshot = persist::decode(&bytes)?;
        if snapshot.metadata.name != name {
            return Err(TesseraError::corrupted(format!(
                "snapshot {name} holds index {}",
                snapshot.metadata.name
            )));
        }

        let shared = Self::from_parts(
            storage,
            snapshot.metadata,
            snapshot.generation,
            snapshot.store,
            writable,
        );

        let generation = shared.snapshot()?;
        log::info!(
            "Opened index {} at generation {} ({} documents, writable: {writable})",
            shared.metadata.name,
            generation.number(),
            generation.document_count()
        );
        Ok(shared)
    }

    fn from_parts(
        storage: Arc<dyn Storage>,
        metadata: IndexMetadata,
        generation: Generation,
        store: DocumentStore,
        writable: bool,
    ) -> Arc<Self> {
        let settings = AnalysisSettings::from_properties(&metadata.config.analysis);
        let analyzer = PipelineAnalyzer::from_settings(&settings);
        let committed = Arc::new(generation);

        Arc::new(IndexShared {
            metadata,
            settings,
            analyzer,
            storage,
            writable,
            closed: AtomicBool::new(false),
            state: RwLock::new(IndexState {
                dictionary: Arc::clone(&committed.dictionary),
                store,
                pending: BTreeMap::new(),
                detached: AHashMap::new(),
                tree_dirty: false,
                committed,
            }),
        })
    }

    pub(crate) fn uuid(&self) -> Uuid {
        self.metadata.uuid
    }

    pub(crate) fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub(crate) fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub(crate) fn analyzer(&self) -> &PipelineAnalyzer {
        &self.analyzer
    }

    pub(crate) fn index_type(&self) -> IndexType {
        self.metadata.config.index_type
    }

    pub(crate) fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub(crate) fn is_writable(&self) -> bool {
        self.writable
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(TesseraError::IndexClosed)
        } else {
            Ok(())
        }
    }

    fn check_writable(&self) -> Result<()> {
        self.check_open()?;
        if self.writable {
            Ok(())
        } else {
            Err(TesseraError::read_only(format!(
                "index {} was opened read-only",
                self.metadata.name
            )))
        }
    }

    /// Mark the index closed. Returns false when it already was.
    pub(crate) fn mark_closed(&self) -> bool {
        let was_open = !self.closed.swap(true, Ordering::AcqRel);
        if was_open {
            log::info!("Closed index {}", self.metadata.name);
        }
        was_open
    }

    /// The committed generation.
    pub(crate) fn snapshot(&self) -> Result<Arc<Generation>> {
        self.check_open()?;
        Ok(Arc::clone(&self.state.read().committed))
    }

    /// Number of buffered document changes.
    pub(crate) fn pending_count(&self) -> usize {
        self.state.read().pending.len()
    }

    /// Run the analyzer over `text`.
    pub(crate) fn analyze(&self, text: &str) -> Result<Vec<Token>> {
        Ok(self.analyzer.analyze(text)?.collect())
    }

    // Document resolution

    fn check_same_index(&self, index_ref: &IndexRef) -> Result<()> {
        if index_ref.index_uuid == self.metadata.uuid {
            Ok(())
        } else {
            Err(TesseraError::invalid_document(format!(
                "document {} belongs to another index",
                index_ref.id
            )))
        }
    }

    fn node_identity(document: &Document, parent: Option<DocumentId>) -> NodeIdentity {
        match document.identity() {
            Identity::Url { url, scheme, name } => NodeIdentity::url(url, scheme, name),
            Identity::Named { scheme, name, .. } => {
                NodeIdentity::named(scheme.as_deref(), parent, name)
            }
        }
    }

    /// Find a document's ID without registering anything.
    ///
    /// Bound documents resolve to their ID even when the node has since been
    /// removed from the tree.
    fn locate(&self, store: &DocumentStore, document: &Document) -> Result<Option<DocumentId>> {
        if let Some(index_ref) = document.index_ref() {
            self.check_same_index(index_ref)?;
            return Ok(Some(index_ref.id));
        }

        let parent = match document.parent() {
            Some(parent) => match self.locate(store, parent)? {
                Some(id) if store.contains(id) => Some(id),
                _ => return Ok(None),
            },
            None => None,
        };
        Ok(store.lookup(&Self::node_identity(document, parent)))
    }

    /// Find or register a document, registering its ancestors as needed.
    fn register_in(&self, store: &mut DocumentStore, document: &Document) -> Result<DocumentId> {
        if let Some(index_ref) = document.index_ref() {
            self.check_same_index(index_ref)?;
            if !store.contains(index_ref.id) {
                return Err(TesseraError::not_indexed(format!(
                    "document {} was removed",
                    index_ref.id
                )));
            }
            return Ok(index_ref.id);
        }

        let parent = match document.parent() {
            Some(parent) => Some(self.register_in(store, parent)?),
            None => None,
        };
        store.register(Self::node_identity(document, parent))
    }

    fn identity_in(
        self: &Arc<Self>,
        store: &DocumentStore,
        id: DocumentId,
        writable: bool,
    ) -> Result<Identity> {
        let node = store
            .get(id)
            .ok_or_else(|| TesseraError::not_indexed(format!("document {id}")))?;
        let identity = &node.identity;

        if let Some(url) = &identity.url {
            return Ok(Identity::Url {
                url: url.clone(),
                scheme: identity.scheme.clone().unwrap_or_default(),
                name: identity.name.clone(),
            });
        }

        let parent = match identity.parent {
            Some(parent_id) => Some(Arc::new(self.document_in(store, parent_id, writable)?)),
            None => None,
        };
        Ok(Identity::Named {
            scheme: identity.scheme.clone(),
            parent,
            name: identity.name.clone(),
        })
    }

    fn document_in(
        self: &Arc<Self>,
        store: &DocumentStore,
        id: DocumentId,
        writable: bool,
    ) -> Result<Document> {
        let identity = self.identity_in(store, id, writable)?;
        let index_ref = IndexRef::new(self, id);
        let binding = if writable && self.writable {
            Binding::MutableBound(index_ref)
        } else {
            Binding::Bound(index_ref)
        };
        Ok(Document::bound(identity, binding))
    }

    /// Resolve a caller-supplied document to its ID, if it is known.
    pub(crate) fn document_id(&self, document: &Document) -> Result<Option<DocumentId>> {
        self.check_open()?;
        let state = self.state.read();
        self.locate(&state.store, document)
    }

    /// Register a document in the tree without indexing text.
    pub(crate) fn register(self: &Arc<Self>, document: &Document) -> Result<Document> {
        self.check_writable()?;
        let mut state = self.state.write();
        let before = state.store.len();
        let id = self.register_in(&mut state.store, document)?;
        let grew = state.store.len() != before;
        state.tree_dirty |= grew;
        self.document_in(&state.store, id, true)
    }

    pub(crate) fn document_by_id(self: &Arc<Self>, id: DocumentId, writable: bool) -> Result<Document> {
        self.check_open()?;
        let state = self.state.read();
        self.document_in(&state.store, id, writable)
    }

    pub(crate) fn identity_of(self: &Arc<Self>, id: DocumentId) -> Result<Identity> {
        self.check_open()?;
        let state = self.state.read();
        self.identity_in(&state.store, id, self.writable)
    }

    pub(crate) fn document_state(&self, document: &Document) -> Result<DocumentState> {
        self.check_open()?;
        let state = self.state.read();
        Ok(match self.locate(&state.store, document)? {
            Some(id) => state.document_state(id),
            None => match self.locate_detached(&state, document)? {
                Some(id) => state.document_state(id),
                None => DocumentState::NotIndexed,
            },
        })
    }

    /// Find an unbound document among those removed since the last commit.
    fn locate_detached(&self, state: &IndexState, document: &Document) -> Result<Option<DocumentId>> {
        if document.is_bound() || state.detached.is_empty() {
            return Ok(None);
        }
        let parent = match document.parent() {
            Some(parent) => match self.locate(&state.store, parent)? {
                Some(id) if state.store.contains(id) => Some(id),
                _ => return Ok(None),
            },
            None => None,
        };
        let key = Self::node_identity(document, parent).key();
        Ok(state.detached.get(&key).copied())
    }

    // Tree

    pub(crate) fn tree_ids(&self, parent: Option<DocumentId>) -> Result<Vec<DocumentId>> {
        self.check_open()?;
        let state = self.state.read();
        match parent {
            Some(id) => state.store.children(id),
            None => Ok(state.store.roots()),
        }
    }

    pub(crate) fn children(self: &Arc<Self>, id: DocumentId, writable: bool) -> Result<DocumentSequence> {
        self.check_open()?;
        if !self.state.read().store.contains(id) {
            return Err(TesseraError::not_indexed(format!("document {id}")));
        }
        Ok(DocumentSequence::new(self, Some(id), writable && self.writable))
    }

    pub(crate) fn roots(self: &Arc<Self>) -> Result<DocumentSequence> {
        self.check_open()?;
        Ok(DocumentSequence::new(self, None, self.writable))
    }

    pub(crate) fn rename_document(&self, id: DocumentId, new_name: &str) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write();
        state.store.rename(id, new_name)?;
        state.tree_dirty = true;
        log::debug!("Renamed document {id} to {new_name}");
        Ok(())
    }

    pub(crate) fn move_document(&self, id: DocumentId, new_parent: Option<&Document>) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write();

        let parent_id = match new_parent {
            Some(parent) => match self.locate(&state.store, parent)? {
                Some(parent_id) if state.store.contains(parent_id) => Some(parent_id),
                _ => {
                    return Err(TesseraError::invalid_document(format!(
                        "new parent {} is not registered in this index",
                        parent.name()
                    )));
                }
            },
            None => None,
        };

        state.store.move_to(id, parent_id)?;
        state.tree_dirty = true;
        Ok(())
    }

    pub(crate) fn properties(&self, id: DocumentId) -> Result<Option<serde_json::Value>> {
        self.check_open()?;
        let state = self.state.read();
        Ok(state.store.properties(id)?.cloned())
    }

    pub(crate) fn set_properties(&self, id: DocumentId, properties: Option<serde_json::Value>) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write();
        state.store.set_properties(id, properties)?;
        state.tree_dirty = true;
        Ok(())
    }

    // Postings mutation

    /// Index `text` for a document. Returns the document's ID.
    pub(crate) fn add_document(&self, document: &Document, text: &str, overwrite: bool) -> Result<DocumentId> {
        self.check_writable()?;
        let tokens = self.analyze(text)?;

        let (id, should_flush) = {
            let mut guard = self.state.write();
            let state = &mut *guard;

            let before = state.store.len();
            let id = self.register_in(&mut state.store, document)?;
            state.tree_dirty |= state.store.len() != before;

            match state.document_state(id) {
                DocumentState::AddPending | DocumentState::Indexed if !overwrite => {
                    return Err(TesseraError::already_indexed(format!(
                        "document {id} ({})",
                        document.name()
                    )));
                }
                _ => {}
            }

            let vector = TermVector::from_tokens(
                tokens.into_iter(),
                Arc::make_mut(&mut state.dictionary),
                self.settings.proximity_indexing,
            );
            state.pending.insert(id, PendingChange::Add(Arc::new(vector)));
            log::debug!("Queued document {id} for indexing");

            (id, self.auto_flush_due(state))
        };

        if should_flush {
            self.auto_flush();
        }
        Ok(id)
    }

    /// Remove a document from the tree and queue its postings for removal.
    pub(crate) fn remove_document(&self, id: DocumentId) -> Result<()> {
        self.check_writable()?;

        let should_flush = {
            let mut guard = self.state.write();
            let state = &mut *guard;

            if !state.store.contains(id) {
                return Err(TesseraError::not_indexed(format!("document {id}")));
            }

            let node = state.store.remove(id)?;
            if state.committed.contains_document(id) {
                state.pending.insert(id, PendingChange::Remove);
                state.detached.insert(node.identity.key(), id);
            } else {
                state.pending.remove(&id);
            }
            state.tree_dirty = true;
            log::debug!("Removed document {id}");

            self.auto_flush_due(state)
        };

        if should_flush {
            self.auto_flush();
        }
        Ok(())
    }

    /// Flush after a mutation crossed the threshold. The mutation already
    /// succeeded, so a failed write leaves it queued for the next flush.
    fn auto_flush(&self) {
        if let Err(e) = self.flush() {
            log::warn!(
                "Auto-flush of {} failed, {} changes stay pending: {e}",
                self.metadata.name,
                self.pending_count()
            );
        }
    }

    fn auto_flush_due(&self, state: &IndexState) -> bool {
        let threshold = self.metadata.config.auto_flush_threshold;
        threshold > 0 && state.pending.len() >= threshold
    }

    // Commit

    fn persist(&self, generation: &Generation, store: &DocumentStore) -> Result<()> {
        let bytes = persist::encode(&self.metadata, generation, store)?;
        persist::write(self.storage.as_ref(), &self.metadata.name, &bytes)?;
        log::debug!(
            "Wrote snapshot of {} at generation {} ({} bytes)",
            self.metadata.name,
            generation.number(),
            bytes.len()
        );
        Ok(())
    }

    /// Build the generation that commits the pending changes, or `None` when
    /// there is nothing to commit.
    fn next_generation(&self, state: &IndexState) -> Result<Option<Generation>> {
        if state.pending.is_empty() && !state.tree_dirty {
            return Ok(None);
        }
        state
            .committed
            .apply(
                &state.dictionary,
                &state.pending,
                state.store.max_allocated_id(),
                self.index_type().supports_inverted(),
            )
            .map(Some)
    }

    /// Swap in a generation that was already persisted.
    fn install(state: &mut IndexState, next: Generation) -> usize {
        let operations = state.pending.len();
        state.dictionary = Arc::clone(&next.dictionary);
        state.committed = Arc::new(next);
        state.pending.clear();
        state.detached.clear();
        state.tree_dirty = false;
        operations
    }

    pub(crate) fn flush(&self) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write();
        let Some(next) = self.next_generation(&state)? else {
            return Ok(());
        };
        self.persist(&next, &state.store)?;

        let operations = Self::install(&mut state, next);
        log::info!(
            "Flushed {operations} document changes to {} (generation {}, {} documents)",
            self.metadata.name,
            state.committed.number(),
            state.committed.document_count()
        );
        Ok(())
    }

    /// Flush and compact with a single snapshot write. Nothing changes in
    /// memory unless that write succeeds.
    pub(crate) fn compact(&self) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write();

        let (next, retired) = match self.next_generation(&state)? {
            Some(flushed) => flushed.compacted(),
            None => state.committed.compacted(),
        };
        self.persist(&next, &state.store)?;

        let operations = Self::install(&mut state, next);
        log::info!(
            "Compacted {}: committed {operations} document changes, retired {retired} unused terms",
            self.metadata.name
        );
        Ok(())
    }

    /// Snapshot bytes of the committed state.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        self.check_open()?;
        let state = self.state.read();
        persist::encode(&self.metadata, &state.committed, &state.store)
    }

    // Terms

    pub(crate) fn string_for_term_id(&self, id: TermId) -> Result<String> {
        let generation = self.snapshot()?;
        Ok(generation.dictionary().string_for_id(id)?.to_string())
    }
}
