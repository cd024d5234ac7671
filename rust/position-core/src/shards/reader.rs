// rust/position-core/src/shards/reader.rs

//! Shard reader.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DataError, Result};
use crate::storage::StorageBackend;
use crate::table::Table;

use super::format::{checksum, ShardHeader};

/// Reads and verifies shard files.
pub struct ShardReader {
    storage: Arc<dyn StorageBackend>,
}

impl ShardReader {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Reads, decompresses and verifies one shard.
    ///
    /// # Errors
    ///
    /// `Storage` if the file cannot be read; `Serialization` if the magic,
    /// version, size, checksum or column layout do not check out.
    pub fn read(&self, path: &Path) -> Result<Table> {
        let mut reader = self.storage.open_read(path)?;
        let header = read_header_from(&mut *reader, path)?;
        let compressed = reader.read_remaining()?;

        let payload = header.compression.decompress(&compressed)?;

        if payload.len() as u64 != header.uncompressed_size {
            return Err(corrupt(
                path,
                format!(
                    "size mismatch: expected {}, got {}",
                    header.uncompressed_size,
                    payload.len()
                ),
            ));
        }

        let computed = checksum(&payload);
        if computed != header.checksum {
            return Err(corrupt(
                path,
                format!(
                    "checksum mismatch: expected {}, got {computed}",
                    header.checksum
                ),
            ));
        }

        let table: Table = bincode::deserialize(&payload)
            .map_err(|e| corrupt(path, format!("failed to deserialize table: {e}")))?;

        if table.len() as u64 != header.row_count || table.layout() != header.columns {
            return Err(corrupt(path, "payload does not match header layout"));
        }

        Ok(table)
    }

    /// Reads only the header, without touching the payload.
    pub fn read_header(&self, path: &Path) -> Result<ShardHeader> {
        let mut reader = self.storage.open_read(path)?;
        read_header_from(&mut *reader, path)
    }
}

fn read_header_from<R: Read + ?Sized>(reader: &mut R, path: &Path) -> Result<ShardHeader> {
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .map_err(|e| corrupt(path, format!("failed to read header length: {e}")))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let mut header_bytes = Vec::new();
    (&mut *reader)
        .take(header_len as u64)
        .read_to_end(&mut header_bytes)
        .map_err(|e| corrupt(path, format!("failed to read header: {e}")))?;
    if header_bytes.len() != header_len {
        return Err(corrupt(path, "shard truncated: header incomplete"));
    }

    let header: ShardHeader = bincode::deserialize(&header_bytes)
        .map_err(|e| corrupt(path, format!("failed to deserialize header: {e}")))?;

    if !header.validate_magic() {
        return Err(corrupt(
            path,
            format!(
                "invalid magic bytes: expected {:?}, got {:?}",
                ShardHeader::MAGIC,
                header.magic
            ),
        ));
    }
    if !header.validate_version() {
        return Err(corrupt(
            path,
            format!(
                "unsupported version: expected {}, got {}",
                ShardHeader::VERSION,
                header.version
            ),
        ));
    }

    Ok(header)
}

fn corrupt(path: &Path, message: impl std::fmt::Display) -> DataError {
    DataError::serialization(format!("{}: {message}", path.display()))
}
