//! Committed index generations.
//!
//! A [`Generation`] is an immutable view of everything a search can see:
//! the dictionary with committed document frequencies, the postings and the
//! term vectors. Each flush builds the next generation from the previous one
//! plus the pending changes. Posting lists and term vectors sit behind `Arc`s,
//! so a new generation shares every list it does not touch.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::document::DocumentId;
use crate::error::Result;
use crate::index::dictionary::TermDictionary;
use crate::index::posting::{Posting, PostingList, TermVector};
use crate::index::term::TermId;

/// A buffered document mutation, applied at the next flush.
#[derive(Debug, Clone)]
pub enum PendingChange {
    /// Index (or re-index) the document with this term vector.
    Add(Arc<TermVector>),
    /// Drop the document's postings.
    Remove,
}

/// One committed state of an index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Generation {
    pub(crate) number: u64,
    pub(crate) dictionary: Arc<TermDictionary>,
    pub(crate) postings: AHashMap<TermId, Arc<PostingList>>,
    pub(crate) vectors: AHashMap<DocumentId, Arc<TermVector>>,
    pub(crate) max_document_id: DocumentId,
}

impl Generation {
    /// The generation number; 0 for an index that was never flushed.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> usize {
        self.vectors.len()
    }

    /// The highest document ID allocated as of this generation.
    pub fn max_document_id(&self) -> DocumentId {
        self.max_document_id
    }

    /// The dictionary as of this generation.
    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    /// The posting list of a term.
    pub fn postings(&self, term_id: TermId) -> Option<&PostingList> {
        self.postings.get(&term_id).map(Arc::as_ref)
    }

    /// The term vector of a document.
    pub fn vector(&self, doc_id: DocumentId) -> Option<&TermVector> {
        self.vectors.get(&doc_id).map(Arc::as_ref)
    }

    /// Whether a document has committed postings.
    pub fn contains_document(&self, doc_id: DocumentId) -> bool {
        self.vectors.contains_key(&doc_id)
    }

    /// Indexed document IDs, ascending.
    pub fn document_ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self.vectors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Build the next generation by applying pending changes.
    ///
    /// `dictionary` is the writer's dictionary, which already holds every
    /// term the pending vectors reference. Posting lists are maintained only
    /// when `inverted` is set.
    pub(crate) fn apply(
        &self,
        dictionary: &Arc<TermDictionary>,
        pending: &BTreeMap<DocumentId, PendingChange>,
        max_document_id: DocumentId,
        inverted: bool,
    ) -> Result<Generation> {
        let mut next = Generation {
            number: self.number + 1,
            dictionary: Arc::clone(dictionary),
            postings: self.postings.clone(),
            vectors: self.vectors.clone(),
            max_document_id,
        };
        let dict = Arc::make_mut(&mut next.dictionary);

        for (&doc_id, change) in pending {
            if let Some(old) = next.vectors.remove(&doc_id) {
                for occurrence in old.iter() {
                    dict.adjust_document_frequency(occurrence.term_id, -1)?;
                    if !inverted {
                        continue;
                    }

                    let now_empty = match next.postings.get_mut(&occurrence.term_id) {
                        Some(list) => {
                            let list = Arc::make_mut(list);
                            list.remove(doc_id);
                            list.is_empty()
                        }
                        None => false,
                    };
                    if now_empty {
                        next.postings.remove(&occurrence.term_id);
                    }
                }
            }

            if let PendingChange::Add(vector) = change {
                for occurrence in vector.iter() {
                    dict.adjust_document_frequency(occurrence.term_id, 1)?;
                    if inverted {
                        let list = next.postings.entry(occurrence.term_id).or_default();
                        Arc::make_mut(list).upsert(Posting {
                            doc_id,
                            term_freq: occurrence.term_freq,
                            positions: occurrence.positions.clone(),
                        });
                    }
                }
                next.vectors.insert(doc_id, Arc::clone(vector));
            }
        }

        Ok(next)
    }

    /// Build a compacted copy: unused terms retired, storage shrunk.
    ///
    /// Returns the new generation and the number of retired terms.
    pub(crate) fn compacted(&self) -> (Generation, usize) {
        let mut next = self.clone();
        next.number += 1;

        let retired = Arc::make_mut(&mut next.dictionary).retire_unused();

        for list in next.postings.values_mut() {
            Arc::make_mut(list).shrink_to_fit();
        }
        next.postings.shrink_to_fit();
        next.vectors.shrink_to_fit();

        (next, retired)
    }
}
