//! Indices: the document tree, the term dictionary and the postings.
//!
//! An index comes in two capabilities. [`Index`] is read-only; a
//! [`WritableIndex`] dereferences to [`Index`] and adds the mutation API
//! (`add`, `update`, `remove`, `rename`, `move_document`, `flush`,
//! `compact`).
//!
//! # Commit model
//!
//! Document tree edits (registration, rename, move, removal, properties)
//! apply immediately. Postings changes are buffered per document and become
//! visible at the next [`flush`](WritableIndex::flush). Document counts,
//! postings lookups and searches always reflect the last committed
//! generation. Searches capture the generation that was current when they
//! were created, so a flush or compaction never disturbs one in flight.
//!
//! # Example
//!
//! ```
//! use tessera::document::Document;
//! use tessera::index::{IndexConfig, WritableIndex};
//!
//! # fn main() -> tessera::error::Result<()> {
//! let index = WritableIndex::create_in_memory("notes", IndexConfig::default())?;
//! let doc = Document::new(Some("mem"), None, "groceries")?;
//! index.add(&doc, "apples and pears")?;
//! assert_eq!(index.document_count()?, 0);
//!
//! index.flush()?;
//! assert_eq!(index.document_count()?, 1);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::property::AnalysisProperty;
use crate::error::Result;

pub mod dictionary;
pub mod generation;
pub mod persist;
pub mod posting;
pub mod reader;
pub(crate) mod shared;
pub mod term;
pub mod writer;

pub use dictionary::TermDictionary;
pub use reader::Index;
pub use term::{Term, TermId};
pub use writer::WritableIndex;

/// The kind of structure an index maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    /// Maps terms to documents; supports literal term search.
    Inverted,
    /// Maps documents to terms; supports similarity search.
    Vector,
    /// Both capabilities.
    InvertedVector,
}

impl IndexType {
    /// Whether literal term search is available.
    pub fn supports_inverted(self) -> bool {
        matches!(self, IndexType::Inverted | IndexType::InvertedVector)
    }

    /// Whether similarity search is available.
    pub fn supports_vector(self) -> bool {
        matches!(self, IndexType::Vector | IndexType::InvertedVector)
    }
}

impl Default for IndexType {
    fn default() -> Self {
        IndexType::InvertedVector
    }
}

/// The indexing state of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// No committed or pending postings.
    NotIndexed,
    /// Postings will be (re)written at the next flush.
    AddPending,
    /// Postings are committed.
    Indexed,
    /// Committed postings will be dropped at the next flush.
    DeletePending,
}

/// Configuration for an index, fixed at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Which structures the index maintains.
    pub index_type: IndexType,

    /// Tokenization options.
    pub analysis: Vec<AnalysisProperty>,

    /// Flush automatically once this many document changes are buffered
    /// (0 = only on explicit flush). A failed auto-flush is logged and the
    /// changes stay pending; the mutation that triggered it still succeeds.
    pub auto_flush_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            index_type: IndexType::default(),
            analysis: Vec::new(),
            auto_flush_threshold: 0,
        }
    }
}

impl IndexConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the index type.
    pub fn with_index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Append an analysis property.
    pub fn with_property(mut self, property: AnalysisProperty) -> Self {
        self.analysis.push(property);
        self
    }

    /// Set the auto-flush threshold.
    pub fn with_auto_flush_threshold(mut self, threshold: usize) -> Self {
        self.auto_flush_threshold = threshold;
        self
    }
}

/// Descriptive metadata persisted with every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub config: IndexConfig,
}

impl IndexMetadata {
    pub(crate) fn new(name: &str, config: IndexConfig) -> Self {
        IndexMetadata {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            created_at: Utc::now(),
            config,
        }
    }
}
