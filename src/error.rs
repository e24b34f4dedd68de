//! Error types for the Tessera library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`TesseraError`] enum. Structural and state-machine failures
//! (`AlreadyIndexed`, `CycleDetected`, `InvalidDocument`, ...) are ordinary
//! values that callers are expected to branch on.
//!
//! # Examples
//!
//! ```
//! use tessera::error::{Result, TesseraError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(TesseraError::invalid_document("empty name"))
//! }
//!
//! match example_operation() {
//!     Err(TesseraError::InvalidDocument(msg)) => assert_eq!(msg, "empty name"),
//!     _ => unreachable!(),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Tessera operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// Malformed document identity (empty name, bad URL, foreign parent, ...).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The document already has postings and overwrite was not requested.
    #[error("Document already indexed: {0}")]
    AlreadyIndexed(String),

    /// The document is unknown to the index.
    #[error("Document not indexed: {0}")]
    NotIndexed(String),

    /// The term ID was never allocated or has been reclaimed.
    #[error("Invalid term ID: {0}")]
    InvalidTermId(u64),

    /// A term that was never indexed was used for a postings lookup.
    #[error("Term not found: {0}")]
    TermNotFound(String),

    /// A move would make a document its own ancestor.
    #[error("Cycle detected: {0}")]
    CycleDetected(String),

    /// The owning index has been closed or dropped.
    #[error("Index is closed")]
    IndexClosed,

    /// The search was terminated early.
    #[error("Search cancelled")]
    Cancelled,

    /// Backing storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Mutation attempted through a read-only capability.
    #[error("Read-only: {0}")]
    ReadOnly(String),

    /// The index type does not support the requested operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Invalid argument supplied by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisted index data failed validation.
    #[error("Corrupted index data: {0}")]
    Corrupted(String),

    /// An internal invariant was broken.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// I/O errors from file-backed storage.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary snapshot encoding errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type alias for operations that may fail with TesseraError.
pub type Result<T> = std::result::Result<T, TesseraError>;

impl TesseraError {
    /// Create a new invalid document error.
    pub fn invalid_document<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvalidDocument(msg.into())
    }

    /// Create a new already-indexed error.
    pub fn already_indexed<S: Into<String>>(msg: S) -> Self {
        TesseraError::AlreadyIndexed(msg.into())
    }

    /// Create a new not-indexed error.
    pub fn not_indexed<S: Into<String>>(msg: S) -> Self {
        TesseraError::NotIndexed(msg.into())
    }

    /// Create a new cycle error.
    pub fn cycle<S: Into<String>>(msg: S) -> Self {
        TesseraError::CycleDetected(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        TesseraError::Storage(msg.into())
    }

    /// Create a new read-only error.
    pub fn read_only<S: Into<String>>(msg: S) -> Self {
        TesseraError::ReadOnly(msg.into())
    }

    /// Create a new unsupported operation error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        TesseraError::Unsupported(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvalidArgument(msg.into())
    }

    /// Create a new corrupted data error.
    pub fn corrupted<S: Into<String>>(msg: S) -> Self {
        TesseraError::Corrupted(msg.into())
    }

    /// Create a new invariant violation error.
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvariantViolation(msg.into())
    }

    /// Whether this error is a terminal status rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TesseraError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = TesseraError::invalid_document("empty name");
        assert_eq!(error.to_string(), "Invalid document: empty name");

        let error = TesseraError::cycle("3 -> 1");
        assert_eq!(error.to_string(), "Cycle detected: 3 -> 1");

        let error = TesseraError::InvalidTermId(42);
        assert_eq!(error.to_string(), "Invalid term ID: 42");

        assert_eq!(TesseraError::IndexClosed.to_string(), "Index is closed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = TesseraError::from(io_error);

        match error {
            TesseraError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }
    }

    #[test]
    fn test_cancelled_is_terminal_status() {
        assert!(TesseraError::Cancelled.is_cancelled());
        assert!(!TesseraError::IndexClosed.is_cancelled());
    }
}
