//! Storage abstraction layer for Tessera.
//!
//! An index persists its committed generation into a byte-addressable
//! container. The container is pluggable: the engine only talks to the
//! [`Storage`] trait, so file and memory backends can be swapped without
//! touching the index code.
//!
//! # Storage Types
//!
//! ## FileStorage
//! - Disk-based persistent storage rooted at a directory
//! - Configurable buffering and write syncing
//!
//! ## MemoryStorage
//! - In-memory storage for testing and for indices built from raw bytes
//! - Fast but non-persistent
//!
//! # Example
//!
//! ```
//! use tessera::storage::{StorageConfig, StorageFactory};
//! use tessera::storage::memory::MemoryStorageConfig;
//!
//! # fn main() -> tessera::error::Result<()> {
//! let storage = StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default()))?;
//! assert!(!storage.file_exists("docs.idx"));
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Seek, Write};
use std::sync::Arc;

use crate::error::{Result, TesseraError};

pub mod file;
pub mod memory;
pub mod structured;

/// A trait for storage backends that can store and retrieve named blobs.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any previous content.
    ///
    /// For backends that buffer writes, the content becomes visible when the
    /// output is closed.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Atomically replace `new_name` with `old_name`.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Sync all pending writes to durable storage.
    fn sync(&self) -> Result<()>;

    /// Close the storage. Every later operation fails with `StorageClosed`.
    fn close(&self) -> Result<()>;
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Seek + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;

    /// Close the input stream.
    fn close(&mut self) -> Result<()>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Seek + Send + std::fmt::Debug {
    /// Flush and sync the output to storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Get the current position in the output stream.
    fn position(&self) -> Result<u64>;

    /// Close the output stream, publishing its content.
    fn close(&mut self) -> Result<()>;
}

impl StorageOutput for Box<dyn StorageOutput> {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.as_mut().flush_and_sync()
    }

    fn position(&self) -> Result<u64> {
        self.as_ref().position()
    }

    fn close(&mut self) -> Result<()> {
        self.as_mut().close()
    }
}

impl StorageInput for Box<dyn StorageInput> {
    fn size(&self) -> Result<u64> {
        self.as_ref().size()
    }

    fn close(&mut self) -> Result<()> {
        self.as_mut().close()
    }
}

/// Configuration for storage backends.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// File-based storage configuration (includes path)
    File(file::FileStorageConfig),

    /// Memory-based storage configuration
    Memory(memory::MemoryStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory(memory::MemoryStorageConfig::default())
    }
}

/// A factory for creating storage instances.
pub struct StorageFactory;

impl StorageFactory {
    /// Create a new storage instance with the given configuration.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(mem_config) => {
                let storage = memory::MemoryStorage::new(mem_config);
                Ok(Arc::new(storage))
            }
            StorageConfig::File(file_config) => {
                let storage = file::FileStorage::new(file_config)?;
                Ok(Arc::new(storage))
            }
        }
    }

    /// Open an existing storage instance.
    ///
    /// File storage requires the directory to exist already.
    pub fn open(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        if let StorageConfig::File(file_config) = &config {
            if !file_config.path.is_dir() {
                return Err(StorageError::FileNotFound(file_config.path.display().to_string()).into());
            }
        }
        Self::create(config)
    }
}

/// Error types specific to storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// File not found.
    FileNotFound(String),

    /// I/O error.
    IoError(String),

    /// Storage is closed.
    StorageClosed,

    /// Invalid operation.
    InvalidOperation(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
            StorageError::StorageClosed => write!(f, "Storage is closed"),
            StorageError::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for TesseraError {
    fn from(err: StorageError) -> Self {
        TesseraError::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::file::FileStorageConfig;
    use crate::storage::memory::MemoryStorageConfig;

    #[test]
    fn test_storage_config_default() {
        match StorageConfig::default() {
            StorageConfig::Memory(mem_config) => {
                assert_eq!(mem_config.initial_capacity, 16);
            }
            _ => panic!("Expected Memory config"),
        }
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::FileNotFound("docs.idx".to_string());
        assert_eq!(err.to_string(), "File not found: docs.idx");

        let err = StorageError::StorageClosed;
        assert_eq!(err.to_string(), "Storage is closed");

        let converted: TesseraError = StorageError::IoError("disk full".to_string()).into();
        assert_eq!(converted.to_string(), "Storage error: I/O error: disk full");
    }

    #[test]
    fn test_storage_factory_memory() {
        let config = StorageConfig::Memory(MemoryStorageConfig::default());
        let storage = StorageFactory::create(config).unwrap();

        assert!(!storage.file_exists("docs.idx"));
    }

    #[test]
    fn test_storage_factory_file_round_trip() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::File(FileStorageConfig::new(temp_dir.path()));
        let storage = StorageFactory::create(config).unwrap();

        let mut output = storage.create_output("blob.bin").unwrap();
        output.write_all(b"Hello, Factory!").unwrap();
        output.close().unwrap();

        let mut input = storage.open_input("blob.bin").unwrap();
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).unwrap();

        assert_eq!(buffer, b"Hello, Factory!");
    }

    #[test]
    fn test_storage_factory_open_missing_directory() {
        let config = StorageConfig::File(FileStorageConfig::new("/nonexistent/tessera/dir"));
        assert!(StorageFactory::open(config).is_err());
    }
}
