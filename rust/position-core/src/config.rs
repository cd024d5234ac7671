// rust/position-core/src/config.rs

//! Configuration for the position data pipeline.
//!
//! Parsed from TOML with per-section defaults; unknown keys are rejected so a
//! misspelt option fails loudly instead of silently falling back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{DataError, Result};
use crate::position::is_identifier;
use crate::shards::CompressionType;

// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub shards: ShardConfig,
    pub generator: GeneratorConfig,
    pub database: DatabaseConfig,
}

// Local file storage options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    // Root that relative shard directories resolve against.
    pub base_path: PathBuf,
    // Buffer size in bytes for I/O operations.
    pub buffer_size: usize,
    // Whether to memory-map large shard files on read.
    pub use_mmap: bool,
    // File size threshold (bytes) above which to use mmap.
    pub mmap_threshold: u64,
}

/// Shard writing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShardConfig {
    /// Shard directory, relative to `storage.base_path` unless absolute.
    pub directory: PathBuf,
    /// Suffix shared by every shard file of one data set.
    pub base_name: String,
    /// Rows per shard when preprocessing.
    pub rows_per_shard: usize,
    /// Upper bound on the number of shards a preprocess run may produce.
    pub max_shards: usize,
    /// Compression algorithm: "none", "lz4", or "zstd".
    pub compression: String,
    /// Compression level (zstd only).
    pub compression_level: i32,
    /// Column holding the FEN text in raw input tables.
    pub fen_column: String,
    /// Column holding the evaluation in raw and encoded tables.
    pub evaluation_column: String,
    /// Drop forced-mate rows before encoding.
    pub strip_mates: bool,
}

/// Where the generator takes its features from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMode {
    /// The store holds one Bool column per feature.
    #[default]
    Encoded,
    /// The store holds FEN text, encoded per batch.
    Raw,
}

/// Batch generator options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    // Optional seed for reproducible shuffling.
    pub seed: Option<u64>,
    // Inclusive key range served by the generator.
    pub min_row: i64,
    pub max_row: i64,
    pub features: FeatureMode,
    // FEN column read in raw mode.
    pub fen_column: String,
    pub target_columns: Vec<String>,
    // Custom feature schema; the canonical names are used when absent.
    pub schema_path: Option<PathBuf>,
}

/// Relational store options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub path: PathBuf,
    pub table: String,
    /// Integer column used as the row key.
    pub key_column: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./data"),
            buffer_size: 64 * 1024,      // 64 KB
            use_mmap: true,
            mmap_threshold: 1024 * 1024, // 1 MB
        }
    }
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("processed"),
            base_name: "positions.shard".to_string(),
            rows_per_shard: 100_000,
            max_shards: 1_000,
            compression: "lz4".to_string(),
            compression_level: 3,
            fen_column: "FEN".to_string(),
            evaluation_column: "Evaluation".to_string(),
            strip_mates: true,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 256,
            shuffle: true,
            seed: None,
            min_row: 0,
            max_row: i64::MAX,
            features: FeatureMode::Encoded,
            fen_column: "FEN".to_string(),
            target_columns: vec!["Evaluation".to_string()],
            schema_path: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/positions.db"),
            table: "positions".to_string(),
            key_column: "index".to_string(),
        }
    }
}

impl ShardConfig {
    pub fn compression_type(&self) -> Result<CompressionType> {
        self.compression.parse()
    }
}

impl FromStr for PipelineConfig {
    type Err = DataError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| DataError::config_with_source("failed to parse TOML config", e))
    }
}

impl PipelineConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::storage_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        // Storage validation
        if self.storage.buffer_size == 0 {
            return Err(DataError::config(
                "storage.buffer_size must be greater than 0",
            ));
        }

        // Shard validation
        if self.shards.base_name.is_empty() {
            return Err(DataError::config("shards.base_name must not be empty"));
        }
        if self.shards.base_name.contains(['/', '\\']) {
            return Err(DataError::config(
                "shards.base_name must not contain path separators",
            ));
        }
        if self.shards.rows_per_shard == 0 {
            return Err(DataError::config(
                "shards.rows_per_shard must be greater than 0",
            ));
        }
        if self.shards.max_shards == 0 {
            return Err(DataError::config(
                "shards.max_shards must be greater than 0",
            ));
        }
        self.shards.compression_type()?;

        // Generator validation
        if self.generator.batch_size == 0 {
            return Err(DataError::config(
                "generator.batch_size must be greater than 0",
            ));
        }
        if self.generator.min_row > self.generator.max_row {
            return Err(DataError::config(format!(
                "generator.min_row ({}) must not exceed generator.max_row ({})",
                self.generator.min_row, self.generator.max_row
            )));
        }
        if self.generator.target_columns.is_empty() {
            return Err(DataError::config(
                "generator.target_columns must name at least one column",
            ));
        }

        // Database validation
        for (field, value) in [
            ("database.table", &self.database.table),
            ("database.key_column", &self.database.key_column),
        ] {
            if !is_identifier(value) {
                return Err(DataError::config(format!(
                    "{field} '{value}' is not a valid identifier"
                )));
            }
        }

        Ok(())
    }

    /// Shard directory resolved against the storage root.
    pub fn shard_dir(&self) -> PathBuf {
        self.storage.base_path.join(&self.shards.directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();

        assert_eq!(config.storage.base_path, PathBuf::from("./data"));
        assert_eq!(config.storage.buffer_size, 64 * 1024);
        assert!(config.storage.use_mmap);
        assert_eq!(config.storage.mmap_threshold, 1024 * 1024);

        assert_eq!(config.shards.base_name, "positions.shard");
        assert_eq!(config.shards.rows_per_shard, 100_000);
        assert_eq!(config.shards.compression, "lz4");
        assert!(config.shards.strip_mates);

        assert_eq!(config.generator.batch_size, 256);
        assert!(config.generator.shuffle);
        assert!(config.generator.seed.is_none());
        assert_eq!(config.generator.features, FeatureMode::Encoded);
        assert_eq!(config.generator.target_columns, vec!["Evaluation"]);

        assert_eq!(config.database.table, "positions");
        assert_eq!(config.database.key_column, "index");
    }

    #[test]
    fn test_default_validates() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_empty() {
        let config: PipelineConfig = "".parse().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_from_str_partial() {
        let toml = r#"
            [generator]
            batch_size = 1024
            seed = 7
            features = "raw"
        "#;
        let config: PipelineConfig = toml.parse().unwrap();

        assert_eq!(config.generator.batch_size, 1024);
        assert_eq!(config.generator.seed, Some(7));
        assert_eq!(config.generator.features, FeatureMode::Raw);
        // Untouched fields keep their defaults
        assert!(config.generator.shuffle);
        assert_eq!(config.shards.base_name, "positions.shard");
    }

    #[test]
    fn test_from_str_full() {
        let toml = r#"
            [storage]
            base_path = "/data/chess"
            buffer_size = 131072
            use_mmap = false
            mmap_threshold = 2097152

            [shards]
            directory = "encoded"
            base_name = "dataprocessed.p"
            rows_per_shard = 5000
            max_shards = 50
            compression = "zstd"
            compression_level = 5
            fen_column = "fen"
            evaluation_column = "eval"
            strip_mates = false

            [generator]
            batch_size = 64
            shuffle = false
            min_row = 10
            max_row = 9999
            target_columns = ["eval"]
            schema_path = "/etc/schema.toml"

            [database]
            path = "/data/chess/positions.db"
            table = "db_positions"
            key_column = "idx"
        "#;

        let config: PipelineConfig = toml.parse().unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.storage.base_path, PathBuf::from("/data/chess"));
        assert!(!config.storage.use_mmap);
        assert_eq!(config.shards.base_name, "dataprocessed.p");
        assert_eq!(config.shards.compression_type().unwrap(), CompressionType::Zstd);
        assert_eq!(config.shards.rows_per_shard, 5000);
        assert!(!config.shards.strip_mates);
        assert_eq!(config.generator.min_row, 10);
        assert_eq!(config.generator.max_row, 9999);
        assert_eq!(
            config.generator.schema_path,
            Some(PathBuf::from("/etc/schema.toml"))
        );
        assert_eq!(config.database.table, "db_positions");
        assert_eq!(config.shard_dir(), PathBuf::from("/data/chess/encoded"));
    }

    #[test]
    fn test_from_str_rejects_unknown_keys() {
        let toml = r#"
            [generator]
            batchsize = 10
        "#;
        let result: Result<PipelineConfig> = toml.parse();
        assert!(matches!(result, Err(DataError::Config { .. })));
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result: std::result::Result<PipelineConfig, _> = "invalid = [".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [shards]
            base_name = "train.shard"
            "#
        )
        .unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.shards.base_name, "train.shard");
    }

    #[test]
    fn test_from_file_not_found() {
        let result = PipelineConfig::from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(DataError::Storage { .. })));
    }

    #[test]
    fn test_validate_batch_size() {
        let mut config = PipelineConfig::default();
        config.generator.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_row_range() {
        let mut config = PipelineConfig::default();
        config.generator.min_row = 10;
        config.generator.max_row = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_shards() {
        let mut config = PipelineConfig::default();
        config.shards.rows_per_shard = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.shards.compression = "gzip".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.shards.base_name = "../escape".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_database_identifiers() {
        let mut config = PipelineConfig::default();
        config.database.table = "positions; DROP TABLE x".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("database.table"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let original = PipelineConfig::default();
        let toml_str = toml::to_string(&original).unwrap();
        let parsed: PipelineConfig = toml_str.parse().unwrap();
        assert_eq!(original, parsed);
    }
}
