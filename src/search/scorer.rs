//! Relevance scoring.

use std::fmt::Debug;

use ahash::AHashMap;

use crate::index::generation::Generation;
use crate::index::posting::TermVector;
use crate::index::term::TermId;

/// Scores one document of a generation.
pub trait Scorer: Send + Sync + Debug {
    /// Score a document given its term vector.
    fn score(&self, generation: &Generation, vector: &TermVector) -> f32;

    /// Get the name of this scorer.
    fn name(&self) -> &'static str;
}

/// Inverse document frequency, `ln(1 + N / df)`.
///
/// Strictly positive for any term present in at least one document, and
/// decreasing in `df`.
pub fn idf(document_count: usize, document_frequency: u32) -> f32 {
    if document_frequency == 0 {
        return 0.0;
    }
    (1.0 + document_count as f64 / document_frequency as f64).ln() as f32
}

/// Sum of `tf * idf` over the query terms.
#[derive(Debug, Clone)]
pub struct TfIdfScorer {
    weights: Vec<(TermId, f32)>,
}

impl TfIdfScorer {
    pub fn new(generation: &Generation, terms: impl IntoIterator<Item = TermId>) -> Self {
        let count = generation.document_count();
        let weights = terms
            .into_iter()
            .map(|term| {
                let df = generation
                    .dictionary()
                    .document_frequency(term)
                    .unwrap_or(0);
                (term, idf(count, df))
            })
            .collect();
        TfIdfScorer { weights }
    }
}

impl Scorer for TfIdfScorer {
    fn score(&self, _generation: &Generation, vector: &TermVector) -> f32 {
        self.weights
            .iter()
            .map(|&(term, weight)| vector.term_freq(term) as f32 * weight)
            .sum()
    }

    fn name(&self) -> &'static str {
        "tf_idf"
    }
}

/// Scores every document 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantScorer;

impl Scorer for ConstantScorer {
    fn score(&self, _generation: &Generation, _vector: &TermVector) -> f32 {
        0.0
    }

    fn name(&self) -> &'static str {
        "constant"
    }
}

/// Cosine similarity between tf-idf vectors of the query text and a
/// document.
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    query: AHashMap<TermId, f32>,
    query_norm: f32,
}

impl SimilarityScorer {
    /// Build from the query's `(term, frequency)` profile. Terms unknown to
    /// the generation should already be dropped.
    pub fn new(generation: &Generation, profile: &[(TermId, u32)]) -> Self {
        let count = generation.document_count();
        let query: AHashMap<TermId, f32> = profile
            .iter()
            .map(|&(term, tf)| {
                let df = generation
                    .dictionary()
                    .document_frequency(term)
                    .unwrap_or(0);
                (term, tf as f32 * idf(count, df))
            })
            .filter(|(_, weight)| *weight > 0.0)
            .collect();
        let query_norm = query.values().map(|w| w * w).sum::<f32>().sqrt();

        SimilarityScorer { query, query_norm }
    }

    /// Whether the query shares no weighted term with any document.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }
}

impl Scorer for SimilarityScorer {
    fn score(&self, generation: &Generation, vector: &TermVector) -> f32 {
        if self.query_norm == 0.0 {
            return 0.0;
        }

        let count = generation.document_count();
        let mut dot = 0.0f32;
        let mut norm = 0.0f32;
        for occurrence in vector.iter() {
            let df = generation
                .dictionary()
                .document_frequency(occurrence.term_id)
                .unwrap_or(0);
            let weight = occurrence.term_freq as f32 * idf(count, df);
            norm += weight * weight;
            if let Some(query_weight) = self.query.get(&occurrence.term_id) {
                dot += weight * query_weight;
            }
        }

        if dot == 0.0 || norm == 0.0 {
            0.0
        } else {
            dot / (norm.sqrt() * self.query_norm)
        }
    }

    fn name(&self) -> &'static str {
        "similarity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf_is_monotonic() {
        assert!(idf(10, 1) > idf(10, 2));
        assert!(idf(10, 5) > idf(10, 10));
        assert!(idf(10, 10) > 0.0);
        assert_eq!(idf(10, 0), 0.0);
    }
}
