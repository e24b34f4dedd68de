//! Relevance-ranked, resumable search.
//!
//! [`Index::search`](crate::index::Index::search) parses a query string,
//! resolves it against the committed generation and returns a [`Search`]
//! handle. Matches are pulled from the handle in batches with
//! [`Search::find_matches`] or all at once with [`Search::find_all`].
//!
//! Literal searches score documents with `tf * ln(1 + N / df)` summed over
//! the query terms outside negations. Similarity searches rank documents by
//! the cosine of their tf-idf vector with the query's.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use tessera::document::Document;
//! use tessera::index::{IndexConfig, WritableIndex};
//! use tessera::search::SearchOptions;
//!
//! # fn main() -> tessera::error::Result<()> {
//! let index = WritableIndex::create_in_memory("pets", IndexConfig::default())?;
//! index.add(&Document::new(Some("mem"), None, "a")?, "cats and dogs")?;
//! index.add(&Document::new(Some("mem"), None, "b")?, "cats cats cats")?;
//! index.flush()?;
//!
//! let search = index.search("cats", SearchOptions::default())?;
//! let (matches, has_more) = search.find_matches(10, Duration::ZERO)?;
//! assert_eq!(matches.len(), 2);
//! assert!(!has_more);
//! assert_eq!(search.document(matches[0].document_id)?.name(), "b");
//! # Ok(())
//! # }
//! ```

pub mod options;
pub mod query;
pub mod scorer;
pub mod searcher;

pub use options::SearchOptions;
pub use query::{Matcher, QueryNode, QueryParser};
pub use scorer::{ConstantScorer, Scorer, SimilarityScorer, TfIdfScorer};
pub use searcher::{FIND_ALL_BATCH, Match, Search, SearchCanceller};
