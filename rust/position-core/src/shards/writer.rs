// rust/position-core/src/shards/writer.rs

//! Shard writer.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DataError, Result};
use crate::storage::StorageBackend;
use crate::table::Table;

use super::format::{checksum, CompressionType, ShardHeader};

/// Serializes tables into shard files.
///
/// Each shard is written to a hidden `.{name}.tmp` sibling first and renamed
/// into place, so a reader never sees a half-written shard under its final
/// name.
pub struct ShardWriter {
    storage: Arc<dyn StorageBackend>,
    compression: CompressionType,
    compression_level: i32,
}

impl ShardWriter {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        compression: CompressionType,
        compression_level: i32,
    ) -> Self {
        Self {
            storage,
            compression,
            compression_level,
        }
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Writes `table` to `path`, replacing any existing file. Returns the
    /// number of bytes written.
    pub fn write(&self, table: &Table, path: &Path) -> Result<u64> {
        let bytes = self.encode(table)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DataError::storage(path, "shard path has no file name"))?;
        let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

        let mut writer = self.storage.open_write(&temp_path)?;
        writer.write_all(&bytes).map_err(|e| {
            DataError::storage_with_source(&temp_path, "failed to write shard data", e)
        })?;
        writer.finish()?;

        self.storage.rename(&temp_path, path)?;
        Ok(bytes.len() as u64)
    }

    /// Header length, header and compressed payload as one buffer.
    pub(crate) fn encode(&self, table: &Table) -> Result<Vec<u8>> {
        let payload = bincode::serialize(table)
            .map_err(|e| DataError::serialization(format!("failed to serialize table: {e}")))?;

        let header = ShardHeader::new(
            self.compression,
            payload.len() as u64,
            checksum(&payload),
            table.len() as u64,
            table.layout(),
        );
        let compressed = self.compression.compress(&payload, self.compression_level)?;

        let header_bytes = bincode::serialize(&header)
            .map_err(|e| DataError::serialization(format!("failed to serialize header: {e}")))?;
        let header_len = u32::try_from(header_bytes.len())
            .map_err(|_| DataError::serialization("shard header exceeds 4 GiB"))?;

        let mut bytes = Vec::with_capacity(4 + header_bytes.len() + compressed.len());
        bytes.extend_from_slice(&header_len.to_le_bytes());
        bytes.extend_from_slice(&header_bytes);
        bytes.extend_from_slice(&compressed);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::storage::LocalStorage;
    use crate::table::ColumnData;
    use tempfile::TempDir;

    fn create_test_writer(compression: CompressionType) -> (ShardWriter, Arc<dyn StorageBackend>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            base_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config).unwrap());
        (ShardWriter::new(storage.clone(), compression, 3), storage, temp_dir)
    }

    fn sample() -> Table {
        Table::new(vec![5, 6, 7])
            .with_column("w_pawn_a2", ColumnData::Bool(vec![true, false, true]))
            .unwrap()
            .with_column("Evaluation", ColumnData::Int(vec![12, -40, 0]))
            .unwrap()
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let (writer, storage, _temp) = create_test_writer(CompressionType::None);
        let path = Path::new("shards/0positions.shard");

        let written = writer.write(&sample(), path).unwrap();

        assert!(written > 4);
        assert!(storage.exists(path).unwrap());
        assert!(!storage
            .exists(Path::new("shards/.0positions.shard.tmp"))
            .unwrap());
        assert_eq!(
            storage.list(Path::new("shards")).unwrap(),
            vec!["0positions.shard"]
        );
    }

    #[test]
    fn test_encode_header_prefix() {
        let (writer, _storage, _temp) = create_test_writer(CompressionType::Lz4);
        let bytes = writer.encode(&sample()).unwrap();

        let header_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let header: ShardHeader = bincode::deserialize(&bytes[4..4 + header_len]).unwrap();
        assert!(header.validate_magic());
        assert_eq!(header.compression, CompressionType::Lz4);
        assert_eq!(header.row_count, 3);
        assert_eq!(header.columns, sample().layout());
    }

    #[test]
    fn test_zstd_smaller_than_none_for_repetitive_data() {
        let (plain, _s1, _t1) = create_test_writer(CompressionType::None);
        let (packed, _s2, _t2) = create_test_writer(CompressionType::Zstd);

        let n = 2000;
        let table = Table::new((0..n).collect())
            .with_column("flag", ColumnData::Bool(vec![false; n as usize]))
            .unwrap();

        assert!(packed.encode(&table).unwrap().len() < plain.encode(&table).unwrap().len());
    }
}
