// rust/position-core/src/shards/format.rs

//! Shard file format.
//!
//! ```text
//! +------------------------+
//! | Header Length (4 bytes)|  <- u32 little-endian
//! +------------------------+
//! | Header (bincode)       |  <- ShardHeader
//! +------------------------+
//! | Compressed Payload     |  <- bincode-encoded Table
//! +------------------------+
//! ```
//!
//! The header repeats the row count and column layout so a shard set can be
//! inspected without decompressing any payload.

use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::error::{DataError, Result};
use crate::table::DType;

/// Payload compression algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    #[default]
    Lz4,
    Zstd,
}

impl CompressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Lz4 => "lz4",
            CompressionType::Zstd => "zstd",
        }
    }

    /// Compresses `data`. `level` only applies to zstd.
    pub fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>> {
        match self {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
            CompressionType::Zstd => zstd::encode_all(data, level)
                .map_err(|e| DataError::serialization(format!("zstd compression failed: {e}"))),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Lz4 => lz4_flex::decompress_size_prepended(data)
                .map_err(|e| DataError::serialization(format!("lz4 decompression failed: {e}"))),
            CompressionType::Zstd => zstd::decode_all(data)
                .map_err(|e| DataError::serialization(format!("zstd decompression failed: {e}"))),
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(CompressionType::None),
            "lz4" => Ok(CompressionType::Lz4),
            "zstd" => Ok(CompressionType::Zstd),
            other => Err(DataError::config(format!(
                "compression must be one of: none, lz4, zstd (got '{other}')"
            ))),
        }
    }
}

/// Header for a shard file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardHeader {
    /// Magic bytes identifying a shard file ("CPDS")
    pub magic: [u8; 4],
    pub version: u32,
    pub compression: CompressionType,
    /// Size of the payload before compression
    pub uncompressed_size: u64,
    /// XXHash64 of the uncompressed payload
    pub checksum: u64,
    pub row_count: u64,
    /// Column names and dtypes in table order
    pub columns: Vec<(String, DType)>,
}

impl ShardHeader {
    pub const MAGIC: [u8; 4] = *b"CPDS";

    pub const VERSION: u32 = 1;

    pub fn new(
        compression: CompressionType,
        uncompressed_size: u64,
        checksum: u64,
        row_count: u64,
        columns: Vec<(String, DType)>,
    ) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            compression,
            uncompressed_size,
            checksum,
            row_count,
            columns,
        }
    }

    pub fn validate_magic(&self) -> bool {
        self.magic == Self::MAGIC
    }

    pub fn validate_version(&self) -> bool {
        self.version == Self::VERSION
    }
}

/// XXHash64 (seed 0) of `data`.
pub(crate) fn checksum(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_new() {
        let header = ShardHeader::new(
            CompressionType::Lz4,
            1000,
            12345,
            10,
            vec![("w_pawn_a1".to_string(), DType::Bool)],
        );

        assert_eq!(header.magic, ShardHeader::MAGIC);
        assert_eq!(header.version, ShardHeader::VERSION);
        assert_eq!(header.compression, CompressionType::Lz4);
        assert_eq!(header.row_count, 10);
        assert!(header.validate_magic());
        assert!(header.validate_version());
    }

    #[test]
    fn test_validate_magic_and_version() {
        let header = ShardHeader::new(CompressionType::None, 0, 0, 0, Vec::new());

        let mut invalid = header.clone();
        invalid.magic = *b"DTRC";
        assert!(!invalid.validate_magic());

        let mut invalid = header;
        invalid.version = 999;
        assert!(!invalid.validate_version());
    }

    #[test]
    fn test_header_serialization() {
        let header = ShardHeader::new(
            CompressionType::Zstd,
            2000,
            67890,
            3,
            vec![
                ("key".to_string(), DType::Int),
                ("Evaluation".to_string(), DType::Float),
            ],
        );

        let encoded = bincode::serialize(&header).unwrap();
        let decoded: ShardHeader = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_compression_parse() {
        assert_eq!("none".parse::<CompressionType>().unwrap(), CompressionType::None);
        assert_eq!("zstd".parse::<CompressionType>().unwrap(), CompressionType::Zstd);
        assert!(matches!(
            "gzip".parse::<CompressionType>(),
            Err(DataError::Config { .. })
        ));
        assert_eq!(CompressionType::Lz4.to_string(), "lz4");
    }

    #[test]
    fn test_compress_decompress() {
        let data = b"w_pawn_a1 w_pawn_b1 w_pawn_c1 w_pawn_a1 w_pawn_b1 w_pawn_c1".to_vec();
        for compression in [CompressionType::None, CompressionType::Lz4, CompressionType::Zstd] {
            let packed = compression.compress(&data, 3).unwrap();
            assert_eq!(compression.decompress(&packed).unwrap(), data);
        }
    }

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(b"hello world"), checksum(b"hello world"));
        assert_ne!(checksum(b"hello world"), checksum(b"different data"));
    }
}
