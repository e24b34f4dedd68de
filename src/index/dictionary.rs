//! The term dictionary.
//!
//! Maps normalized term strings to stable [`TermId`]s and back, and tracks
//! how many committed documents contain each term. IDs are allocated only
//! as a side effect of indexing text. Compaction may retire terms that no
//! document contains any more; a retired ID is never handed out again.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};
use crate::index::term::TermId;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TermEntry {
    text: Arc<str>,
    doc_freq: u32,
}

/// Bidirectional term string / ID mapping with document frequencies.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TermDictionary {
    /// Entry for ID `n` lives at `entries[n - 1]`; `None` once retired.
    entries: Vec<Option<TermEntry>>,
    lookup: AHashMap<Arc<str>, TermId>,
}

impl TermDictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a term; returns [`TermId::NOT_FOUND`] when absent. Never allocates.
    pub fn id_for_term(&self, term: &str) -> TermId {
        self.lookup.get(term).copied().unwrap_or(TermId::NOT_FOUND)
    }

    /// Look up a term, allocating the next ID when it is new.
    pub fn get_or_insert(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.lookup.get(term) {
            return id;
        }

        let text: Arc<str> = Arc::from(term);
        self.entries.push(Some(TermEntry {
            text: Arc::clone(&text),
            doc_freq: 0,
        }));
        let id = TermId(self.entries.len() as u64);
        self.lookup.insert(text, id);
        id
    }

    fn entry(&self, id: TermId) -> Option<&TermEntry> {
        if !id.is_found() {
            return None;
        }
        self.entries.get((id.0 - 1) as usize)?.as_ref()
    }

    fn entry_mut(&mut self, id: TermId) -> Option<&mut TermEntry> {
        if !id.is_found() {
            return None;
        }
        self.entries.get_mut((id.0 - 1) as usize)?.as_mut()
    }

    /// The string for a term ID.
    pub fn string_for_id(&self, id: TermId) -> Result<Arc<str>> {
        self.entry(id)
            .map(|entry| Arc::clone(&entry.text))
            .ok_or(TesseraError::InvalidTermId(id.0))
    }

    /// Number of committed documents containing the term.
    pub fn document_frequency(&self, id: TermId) -> Result<u32> {
        self.entry(id)
            .map(|entry| entry.doc_freq)
            .ok_or(TesseraError::InvalidTermId(id.0))
    }

    pub(crate) fn adjust_document_frequency(&mut self, id: TermId, delta: i64) -> Result<()> {
        let entry = self
            .entry_mut(id)
            .ok_or(TesseraError::InvalidTermId(id.0))?;
        let updated = entry.doc_freq as i64 + delta;
        if updated < 0 {
            return Err(TesseraError::invariant(format!(
                "document frequency of term {id} would become negative"
            )));
        }
        entry.doc_freq = updated as u32;
        Ok(())
    }

    /// The highest ID allocated so far (0 when none).
    pub fn max_term_id(&self) -> TermId {
        TermId(self.entries.len() as u64)
    }

    /// Number of live (non-retired) terms.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Check if the dictionary has no live terms.
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Iterate over live terms as `(id, text, doc_freq)`.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &str, u32)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, entry)| {
            entry
                .as_ref()
                .map(|e| (TermId(i as u64 + 1), e.text.as_ref(), e.doc_freq))
        })
    }

    /// Live term IDs whose text starts with `prefix`, ascending.
    pub fn ids_with_prefix(&self, prefix: &str) -> Vec<TermId> {
        self.iter()
            .filter(|(_, text, _)| text.starts_with(prefix))
            .map(|(id, _, _)| id)
            .collect()
    }

    /// Retire every term no committed document contains. Returns the number
    /// of retired terms.
    pub(crate) fn retire_unused(&mut self) -> usize {
        let mut retired = 0;
        for slot in self.entries.iter_mut() {
            if matches!(slot, Some(entry) if entry.doc_freq == 0) {
                if let Some(entry) = slot.take() {
                    self.lookup.remove(&entry.text);
                    retired += 1;
                }
            }
        }
        self.lookup.shrink_to_fit();
        retired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_monotonic_and_stable() {
        let mut dict = TermDictionary::new();
        let apple = dict.get_or_insert("apple");
        let banana = dict.get_or_insert("banana");

        assert_eq!(apple, TermId(1));
        assert_eq!(banana, TermId(2));
        assert_eq!(dict.get_or_insert("apple"), apple);
        assert_eq!(dict.max_term_id(), TermId(2));
    }

    #[test]
    fn test_lookup_never_allocates() {
        let dict = TermDictionary::new();
        assert_eq!(dict.id_for_term("missing"), TermId::NOT_FOUND);
        assert_eq!(dict.max_term_id(), TermId(0));
    }

    #[test]
    fn test_round_trip_through_string() {
        let mut dict = TermDictionary::new();
        let id = dict.get_or_insert("search");
        let text = dict.string_for_id(id).unwrap();
        assert_eq!(dict.id_for_term(&text), id);
    }

    #[test]
    fn test_invalid_ids() {
        let mut dict = TermDictionary::new();
        dict.get_or_insert("one");

        assert!(matches!(
            dict.string_for_id(TermId(5)),
            Err(TesseraError::InvalidTermId(5))
        ));
        assert!(dict.string_for_id(TermId::NOT_FOUND).is_err());
    }

    #[test]
    fn test_retired_ids_are_not_reused() {
        let mut dict = TermDictionary::new();
        let a = dict.get_or_insert("a");
        let b = dict.get_or_insert("b");
        dict.adjust_document_frequency(b, 1).unwrap();

        assert_eq!(dict.retire_unused(), 1);
        assert!(dict.string_for_id(a).is_err());
        assert_eq!(dict.id_for_term("a"), TermId::NOT_FOUND);
        assert_eq!(dict.document_frequency(b).unwrap(), 1);

        assert_eq!(dict.get_or_insert("a"), TermId(3));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_document_frequency_cannot_go_negative() {
        let mut dict = TermDictionary::new();
        let a = dict.get_or_insert("a");
        assert!(matches!(
            dict.adjust_document_frequency(a, -1),
            Err(TesseraError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_prefix_lookup() {
        let mut dict = TermDictionary::new();
        let index = dict.get_or_insert("index");
        dict.get_or_insert("search");
        let indexing = dict.get_or_insert("indexing");

        assert_eq!(dict.ids_with_prefix("ind"), vec![index, indexing]);
    }
}
