//! Lazy sequences over the document tree.

use std::sync::{Arc, Weak};

use crate::document::{Document, DocumentId};
use crate::index::shared::IndexShared;

/// A restartable sequence of documents: the roots of an index, or the
/// children of one document.
///
/// Each call to [`iter`](DocumentSequence::iter) snapshots the current list of
/// IDs. Documents added afterwards are not visited; documents removed
/// afterwards are skipped. An iterator over a closed index yields nothing.
#[derive(Debug, Clone)]
pub struct DocumentSequence {
    index: Weak<IndexShared>,
    parent: Option<DocumentId>,
    writable: bool,
}

impl DocumentSequence {
    pub(crate) fn new(shared: &Arc<IndexShared>, parent: Option<DocumentId>, writable: bool) -> Self {
        DocumentSequence {
            index: Arc::downgrade(shared),
            parent,
            writable,
        }
    }

    /// Start a new pass over the sequence.
    pub fn iter(&self) -> DocumentIter {
        let ids = self
            .index
            .upgrade()
            .and_then(|shared| shared.tree_ids(self.parent).ok())
            .unwrap_or_default();

        DocumentIter {
            index: self.index.clone(),
            ids,
            position: 0,
            writable: self.writable,
        }
    }
}

impl<'a> IntoIterator for &'a DocumentSequence {
    type Item = Document;
    type IntoIter = DocumentIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`DocumentSequence`], in ascending ID order.
#[derive(Debug)]
pub struct DocumentIter {
    index: Weak<IndexShared>,
    ids: Vec<DocumentId>,
    position: usize,
    writable: bool,
}

impl Iterator for DocumentIter {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        let shared = self.index.upgrade()?;

        while self.position < self.ids.len() {
            let id = self.ids[self.position];
            self.position += 1;

            match shared.document_by_id(id, self.writable) {
                Ok(document) => return Some(document),
                Err(_) => continue,
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len() - self.position))
    }
}
