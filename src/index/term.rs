//! Terms: index-scoped handles on dictionary entries.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};
use crate::index::shared::IndexShared;

/// Numeric term ID, unique within one index.
///
/// IDs start at 1; [`TermId::NOT_FOUND`] marks a string that was never indexed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TermId(pub u64);

impl TermId {
    /// Sentinel for a term string the index has never seen.
    pub const NOT_FOUND: TermId = TermId(0);

    /// Whether this ID refers to an allocated term.
    pub fn is_found(self) -> bool {
        self != Self::NOT_FOUND
    }

    /// The raw numeric value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A term of one index: its ID plus a lazily resolved string.
///
/// The same string can map to different IDs in different indices. A term
/// created from a string that was never indexed is invalid: its ID is
/// [`TermId::NOT_FOUND`] and postings lookups with it fail with
/// [`TesseraError::TermNotFound`].
#[derive(Clone)]
pub struct Term {
    index: Weak<IndexShared>,
    id: TermId,
    text: OnceLock<String>,
}

impl Term {
    pub(crate) fn new(shared: &Arc<IndexShared>, id: TermId, text: Option<String>) -> Self {
        let cell = OnceLock::new();
        if let Some(text) = text {
            let _ = cell.set(text);
        }
        Term {
            index: Arc::downgrade(shared),
            id,
            text: cell,
        }
    }

    /// The term ID.
    pub fn id(&self) -> TermId {
        self.id
    }

    /// Whether the term exists in its index.
    pub fn is_valid(&self) -> bool {
        self.id.is_found()
    }

    /// The term string, resolved through the index on first access.
    ///
    /// Fails with [`TesseraError::IndexClosed`] once the index is closed,
    /// even when the string was already resolved.
    pub fn text(&self) -> Result<&str> {
        let shared = self.index.upgrade().ok_or(TesseraError::IndexClosed)?;
        shared.check_open()?;
        if let Some(text) = self.text.get() {
            return Ok(text.as_str());
        }

        let text = shared.string_for_term_id(self.id)?;
        Ok(self.text.get_or_init(|| text).as_str())
    }

    /// The ID to use for a postings lookup.
    pub(crate) fn lookup_id(&self) -> Result<TermId> {
        if self.is_valid() {
            Ok(self.id)
        } else {
            Err(TesseraError::TermNotFound(
                self.text.get().cloned().unwrap_or_default(),
            ))
        }
    }

    pub(crate) fn belongs_to(&self, shared: &Arc<IndexShared>) -> bool {
        std::ptr::eq(self.index.as_ptr(), Arc::as_ptr(shared))
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Term")
            .field("id", &self.id)
            .field("text", &self.text.get())
            .finish()
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.index, &other.index) && self.id == other.id
    }
}
