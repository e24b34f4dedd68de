//! Snapshot persistence.
//!
//! A snapshot holds one committed generation plus the document tree. Its
//! layout, written through [`StructWriter`]:
//!
//! ```text
//! u32     magic "TSRA"
//! u16     format version
//! string  index metadata (JSON)
//! bytes   generation and document tree (bincode)
//! u32     CRC32 of everything above
//! ```
//!
//! Writes go to `<name>.tmp` first and are renamed over `<name>.idx` only
//! once complete, so a failed write never clobbers the previous snapshot.

use std::io::{Cursor, Read, Write};

use serde::{Deserialize, Serialize};

use crate::document::DocumentStore;
use crate::error::{Result, TesseraError};
use crate::index::IndexMetadata;
use crate::index::generation::Generation;
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

const MAGIC: u32 = 0x4152_5354; // "TSRA" little-endian
const FORMAT_VERSION: u16 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    generation: &'a Generation,
    store: &'a DocumentStore,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    generation: Generation,
    store: DocumentStore,
}

/// A decoded snapshot.
#[derive(Debug)]
pub struct Snapshot {
    pub metadata: IndexMetadata,
    pub generation: Generation,
    pub store: DocumentStore,
}

/// The storage file name holding an index's snapshot.
pub fn snapshot_file(name: &str) -> String {
    format!("{name}.idx")
}

fn temp_file(name: &str) -> String {
    format!("{name}.tmp")
}

/// Encode a snapshot to bytes.
pub fn encode(
    metadata: &IndexMetadata,
    generation: &Generation,
    store: &DocumentStore,
) -> Result<Vec<u8>> {
    let payload = bincode::serialize(&SnapshotRef { generation, store })?;

    let mut writer = StructWriter::new(Vec::with_capacity(payload.len() + 256));
    writer.write_u32(MAGIC)?;
    writer.write_u16(FORMAT_VERSION)?;
    writer.write_string(&serde_json::to_string(metadata)?)?;
    writer.write_bytes(&payload)?;
    writer.finish()
}

/// Decode and verify a snapshot.
pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
    let mut reader = StructReader::new(Cursor::new(bytes), bytes.len() as u64);

    let magic = reader.read_u32()?;
    if magic != MAGIC {
        return Err(TesseraError::corrupted(format!(
            "bad magic number {magic:#010x}"
        )));
    }
    let version = reader.read_u16()?;
    if version != FORMAT_VERSION {
        return Err(TesseraError::corrupted(format!(
            "unsupported format version {version}"
        )));
    }

    let metadata: IndexMetadata = serde_json::from_str(&reader.read_string()?)?;
    let payload = reader.read_bytes()?;
    reader.verify_checksum()?;

    let SnapshotOwned { generation, store } = bincode::deserialize(&payload)?;
    Ok(Snapshot {
        metadata,
        generation,
        store,
    })
}

/// Write snapshot bytes to storage, replacing any previous snapshot.
pub fn write(storage: &dyn Storage, name: &str, bytes: &[u8]) -> Result<()> {
    let temp = temp_file(name);

    let result = (|| {
        let mut output = storage.create_output(&temp)?;
        output.write_all(bytes)?;
        output.flush_and_sync()?;
        output.close()?;
        storage.rename_file(&temp, &snapshot_file(name))?;
        storage.sync()
    })();

    if result.is_err() && storage.file_exists(&temp) {
        let _ = storage.delete_file(&temp);
    }
    result
}

/// Read snapshot bytes from storage.
pub fn read(storage: &dyn Storage, name: &str) -> Result<Vec<u8>> {
    let mut input = storage.open_input(&snapshot_file(name))?;
    let mut bytes = Vec::with_capacity(input.size()? as usize);
    input.read_to_end(&mut bytes)?;
    input.close()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NodeIdentity;
    use crate::index::IndexConfig;
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    fn sample() -> (IndexMetadata, Generation, DocumentStore) {
        let mut store = DocumentStore::new();
        store
            .register(NodeIdentity::named(Some("mem"), None, "a"))
            .unwrap();
        (
            IndexMetadata::new("sample", IndexConfig::default()),
            Generation::default(),
            store,
        )
    }

    #[test]
    fn test_encode_decode() {
        let (metadata, generation, store) = sample();
        let bytes = encode(&metadata, &generation, &store).unwrap();

        let snapshot = decode(&bytes).unwrap();
        assert_eq!(snapshot.metadata, metadata);
        assert_eq!(snapshot.store.len(), 1);
        assert_eq!(snapshot.generation.number(), 0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"definitely not an index"),
            Err(TesseraError::Corrupted(_))
        ));

        let (metadata, generation, store) = sample();
        let mut bytes = encode(&metadata, &generation, &store).unwrap();
        let last = bytes.len() - 6;
        bytes[last] ^= 0x55;
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_write_replaces_snapshot_atomically() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        write(&storage, "idx", b"first").unwrap();
        write(&storage, "idx", b"second").unwrap();

        assert_eq!(read(&storage, "idx").unwrap(), b"second");
        assert_eq!(storage.list_files().unwrap(), vec!["idx.idx".to_string()]);
    }
}
