//! Search options.

use serde::{Deserialize, Serialize};

/// Flags controlling how a query string is interpreted and ranked.
///
/// # Examples
///
/// ```
/// use tessera::search::SearchOptions;
///
/// let options = SearchOptions::default().with_space_means_or(true);
/// assert!(options.space_means_or);
/// assert!(!options.find_similar);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Skip score computation. Matches come back in ascending ID order with
    /// a score of 0.
    pub no_relevance_scores: bool,

    /// Juxtaposed query words are OR'd instead of AND'd.
    pub space_means_or: bool,

    /// Rank documents by similarity to the query text instead of matching
    /// terms literally. Needs a vector-capable index.
    pub find_similar: bool,
}

impl SearchOptions {
    pub fn with_no_relevance_scores(mut self, value: bool) -> Self {
        self.no_relevance_scores = value;
        self
    }

    pub fn with_space_means_or(mut self, value: bool) -> Self {
        self.space_means_or = value;
        self
    }

    pub fn with_find_similar(mut self, value: bool) -> Self {
        self.find_similar = value;
        self
    }
}
