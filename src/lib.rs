//! # Tessera
//!
//! A hierarchical document index with incremental updates, relevance-ranked
//! search and extractive summarization.
//!
//! ## Features
//!
//! - Document tree with rename, move and per-document properties
//! - Configurable text analysis (stop words, substitutions, term limits)
//! - Buffered postings committed by `flush`, reclaimed by `compact`
//! - Boolean, phrase, prefix and similarity queries with TF-IDF ranking
//! - Paginated, time-bounded and cancellable result retrieval
//! - Sentence and paragraph summaries
//! - Pluggable storage backends (memory, file)

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod search;
pub mod storage;
pub mod summary;
pub mod util;

pub mod prelude {
    pub use crate::analysis::AnalysisProperty;
    pub use crate::document::{Document, DocumentId};
    pub use crate::error::{Result, TesseraError};
    pub use crate::index::{DocumentState, Index, IndexConfig, IndexType, WritableIndex};
    pub use crate::search::{Match, Search, SearchOptions};
    pub use crate::summary::Summary;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
