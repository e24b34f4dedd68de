//! Postings and term vectors.
//!
//! The inverted side maps a term to a [`PostingList`] of documents; the
//! vector side maps a document to its [`TermVector`]. Both carry term
//! frequencies, and positions when proximity indexing is enabled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::token::Token;
use crate::document::DocumentId;
use crate::index::dictionary::TermDictionary;
use crate::index::term::TermId;

/// A single posting in a posting list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Document ID.
    pub doc_id: DocumentId,
    /// Term frequency in the document.
    pub term_freq: u32,
    /// Positions of the term in the document (empty without proximity indexing).
    pub positions: Vec<u32>,
}

/// The documents containing one term, sorted by document ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    /// Create a new empty posting list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the posting for a document.
    pub fn upsert(&mut self, posting: Posting) {
        match self
            .postings
            .binary_search_by_key(&posting.doc_id, |p| p.doc_id)
        {
            Ok(pos) => self.postings[pos] = posting,
            Err(pos) => self.postings.insert(pos, posting),
        }
    }

    /// Remove the posting for a document. Returns whether one was present.
    pub fn remove(&mut self, doc_id: DocumentId) -> bool {
        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(pos) => {
                self.postings.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Get the posting for a document.
    pub fn get(&self, doc_id: DocumentId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|pos| &self.postings[pos])
    }

    /// Number of documents in the list.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Iterate over postings in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// Release spare capacity.
    pub fn shrink_to_fit(&mut self) {
        self.postings.shrink_to_fit();
    }
}

/// One term of a document's term vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermOccurrence {
    pub term_id: TermId,
    pub term_freq: u32,
    pub positions: Vec<u32>,
}

/// The distinct terms of one document, sorted by term ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermVector {
    terms: Vec<TermOccurrence>,
    /// Total number of indexed tokens in the document.
    length: u32,
}

impl TermVector {
    /// Build a term vector from analyzed tokens, allocating term IDs.
    pub fn from_tokens(
        tokens: impl Iterator<Item = Token>,
        dictionary: &mut TermDictionary,
        keep_positions: bool,
    ) -> Self {
        let mut grouped: BTreeMap<TermId, TermOccurrence> = BTreeMap::new();
        let mut length = 0u32;

        for token in tokens {
            length += 1;
            let term_id = dictionary.get_or_insert(&token.text);
            let occurrence = grouped.entry(term_id).or_insert_with(|| TermOccurrence {
                term_id,
                term_freq: 0,
                positions: Vec::new(),
            });
            occurrence.term_freq += 1;
            if keep_positions {
                occurrence.positions.push(token.position as u32);
            }
        }

        TermVector {
            terms: grouped.into_values().collect(),
            length,
        }
    }

    /// Frequency of a term in this document (0 when absent).
    pub fn term_freq(&self, term_id: TermId) -> u32 {
        self.terms
            .binary_search_by_key(&term_id, |t| t.term_id)
            .map(|pos| self.terms[pos].term_freq)
            .unwrap_or(0)
    }

    /// Number of distinct terms.
    pub fn distinct_terms(&self) -> usize {
        self.terms.len()
    }

    /// Total number of indexed tokens.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Iterate over the terms in ID order.
    pub fn iter(&self) -> std::slice::Iter<'_, TermOccurrence> {
        self.terms.iter()
    }

    /// `(term, frequency)` pairs in ID order.
    pub fn frequencies(&self) -> Vec<(TermId, u32)> {
        self.terms.iter().map(|t| (t.term_id, t.term_freq)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_list_keeps_document_order() {
        let mut list = PostingList::new();
        for id in [5, 1, 3] {
            list.upsert(Posting {
                doc_id: DocumentId(id),
                term_freq: 1,
                positions: Vec::new(),
            });
        }

        let ids: Vec<u64> = list.iter().map(|p| p.doc_id.0).collect();
        assert_eq!(ids, vec![1, 3, 5]);

        list.upsert(Posting {
            doc_id: DocumentId(3),
            term_freq: 7,
            positions: Vec::new(),
        });
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(DocumentId(3)).unwrap().term_freq, 7);

        assert!(list.remove(DocumentId(1)));
        assert!(!list.remove(DocumentId(1)));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_term_vector_from_tokens() {
        let mut dictionary = TermDictionary::new();
        let tokens = vec![
            Token::new("to", 0),
            Token::new("be", 1),
            Token::new("or", 2),
            Token::new("not", 3),
            Token::new("to", 4),
            Token::new("be", 5),
        ];

        let vector = TermVector::from_tokens(tokens.into_iter(), &mut dictionary, true);
        let to = dictionary.id_for_term("to");

        assert_eq!(vector.length(), 6);
        assert_eq!(vector.distinct_terms(), 4);
        assert_eq!(vector.term_freq(to), 2);
        assert_eq!(vector.iter().next().unwrap().positions, vec![0, 4]);
        assert_eq!(vector.term_freq(TermId(99)), 0);
    }

    #[test]
    fn test_positions_are_dropped_without_proximity() {
        let mut dictionary = TermDictionary::new();
        let tokens = vec![Token::new("a", 0), Token::new("a", 1)];

        let vector = TermVector::from_tokens(tokens.into_iter(), &mut dictionary, false);
        assert_eq!(vector.term_freq(TermId(1)), 2);
        assert!(vector.iter().all(|t| t.positions.is_empty()));
    }
}
