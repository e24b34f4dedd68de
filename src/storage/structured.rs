//! Structured binary I/O for index snapshots.
//!
//! A [`StructWriter`] writes little-endian scalars and length-prefixed blobs
//! while keeping a running CRC32 of every byte. [`StructWriter::finish`]
//! appends the checksum so a [`StructReader`] can verify the file it read.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;

use crate::error::{Result, TesseraError};
use crate::util::varint::{decode_u64, encode_u64};

/// A structured writer for binary data.
pub struct StructWriter<W: Write> {
    writer: W,
    hasher: Hasher,
    position: u64,
}

impl<W: Write> StructWriter<W> {
    /// Create a new structured writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: Hasher::new(),
            position: 0,
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.update_checksum(&[value]);
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.update_checksum(&value.to_le_bytes());
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.update_checksum(&value.to_le_bytes());
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.update_checksum(&value.to_le_bytes());
        Ok(())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        let encoded = encode_u64(value);
        self.writer.write_all(&encoded)?;
        self.update_checksum(&encoded);
        Ok(())
    }

    /// Write a string with length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Write raw bytes with length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.writer.write_all(value)?;
        self.update_checksum(value);
        Ok(())
    }

    /// Get current position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get the checksum of everything written so far.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    fn update_checksum(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.position += data.len() as u64;
    }

    /// Append the checksum trailer and hand back the inner writer.
    pub fn finish(mut self) -> Result<W> {
        let checksum = self.checksum();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// A structured reader for binary data written by [`StructWriter`].
pub struct StructReader<R: Read> {
    reader: R,
    hasher: Hasher,
    position: u64,
    size: u64,
}

impl<R: Read> StructReader<R> {
    /// Create a new structured reader over `size` bytes, trailer included.
    pub fn new(reader: R, size: u64) -> Self {
        StructReader {
            reader,
            hasher: Hasher::new(),
            position: 0,
            size,
        }
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.reader.read_u8()?;
        self.update_checksum(&[value]);
        Ok(value)
    }

    /// Read a u16 value (little-endian).
    pub fn read_u16(&mut self) -> Result<u16> {
        let value = self.reader.read_u16::<LittleEndian>()?;
        self.update_checksum(&value.to_le_bytes());
        Ok(value)
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.reader.read_u32::<LittleEndian>()?;
        self.update_checksum(&value.to_le_bytes());
        Ok(value)
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        let value = self.reader.read_u64::<LittleEndian>()?;
        self.update_checksum(&value.to_le_bytes());
        Ok(value)
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut bytes = Vec::with_capacity(2);
        loop {
            let byte = self.reader.read_u8()?;
            bytes.push(byte);
            if byte & 0x80 == 0 || bytes.len() > 10 {
                break;
            }
        }

        let (value, _) = decode_u64(&bytes)?;
        self.update_checksum(&bytes);
        Ok(value)
    }

    /// Read a string with length prefix.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| TesseraError::corrupted(format!("Invalid UTF-8: {e}")))
    }

    /// Read bytes with length prefix.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let length = self.read_varint()?;
        if self.position + length > self.size.saturating_sub(4) {
            return Err(TesseraError::corrupted(format!(
                "Length prefix {length} runs past end of data"
            )));
        }

        let mut bytes = vec![0u8; length as usize];
        self.reader.read_exact(&mut bytes)?;
        self.update_checksum(&bytes);
        Ok(bytes)
    }

    /// Get current position.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn update_checksum(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.position += data.len() as u64;
    }

    /// Read the trailer and compare it with the checksum of everything read.
    pub fn verify_checksum(mut self) -> Result<()> {
        if self.position + 4 > self.size {
            return Err(TesseraError::corrupted("File too short for checksum"));
        }

        let computed = self.hasher.clone().finalize();
        let stored = self.reader.read_u32::<LittleEndian>()?;
        if stored != computed {
            return Err(TesseraError::corrupted(format!(
                "Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"
            )));
        }
        Ok(())
    }
}
