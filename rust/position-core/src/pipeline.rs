// rust/position-core/src/pipeline.rs

//! Pipeline orchestration.
//!
//! [`Pipeline`] ties together the pieces a training job needs: storage, the
//! shard store, the feature schema and generator construction.
//!
//! # Example
//!
//! ```no_run
//! use position_core::{Pipeline, PipelineConfig};
//! use position_core::table::{ColumnData, Table};
//!
//! let pipeline = Pipeline::from_config(PipelineConfig::default()).unwrap();
//!
//! // Encode and shard a raw table of positions
//! let raw = Table::new(vec![0, 1])
//!     .with_column("FEN", ColumnData::Text(vec![
//!         "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".into(),
//!         "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1".into(),
//!     ]))
//!     .unwrap()
//!     .with_column("Evaluation", ColumnData::Text(vec!["+20".into(), "-35".into()]))
//!     .unwrap();
//! let report = pipeline.preprocess(&raw).unwrap();
//! println!("wrote {} shards", report.shards_written);
//!
//! // Serve batches from the shard set
//! let mut generator = pipeline.shard_generator().unwrap();
//! for batch in generator.iter() {
//!     let batch = batch.unwrap();
//!     // Feed batch.features / batch.targets to the model
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::PipelineConfig;
use crate::dataset::{BatchGenerator, GeneratorOptions};
use crate::error::Result;
use crate::position::{FeatureSchema, TableEncoder};
use crate::shards::{CompressionType, PreprocessReport, ShardedFileStore};
use crate::storage::{LocalStorage, StorageBackend};
use crate::store::{ShardedTableStore, SqlStore};
use crate::table::Table;

/// Owns the storage backend and the resolved feature schema.
pub struct Pipeline {
    config: PipelineConfig,
    storage: Arc<dyn StorageBackend>,
    compression: CompressionType,
    shards: ShardedFileStore,
    schema: FeatureSchema,
}

impl Pipeline {
    /// Creates a pipeline with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::from_config(PipelineConfig::default())
    }

    /// Creates a pipeline from a TOML configuration file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(PipelineConfig::from_file(path)?)
    }

    /// Creates a pipeline from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the storage backend
    /// cannot be initialized, or the configured schema file cannot be loaded.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config.storage)?);
        let compression = config.shards.compression_type()?;
        let shards = ShardedFileStore::new(
            storage.clone(),
            compression,
            config.shards.compression_level,
        );
        let schema = match &config.generator.schema_path {
            Some(path) => FeatureSchema::from_file(path)?,
            None => FeatureSchema::canonical(),
        };

        Ok(Self {
            config,
            storage,
            compression,
            shards,
            schema,
        })
    }

    /// Encoder bound to the configured FEN and evaluation columns.
    pub fn encoder(&self) -> TableEncoder {
        TableEncoder::new(
            self.schema.clone(),
            &self.config.shards.fen_column,
            &self.config.shards.evaluation_column,
        )
        .strip_mates(self.config.shards.strip_mates)
    }

    /// Encodes `raw` and writes it as a shard set under the configured
    /// directory and base name.
    pub fn preprocess(&self, raw: &Table) -> Result<PreprocessReport> {
        let encoder = self.encoder();
        let report = self.shards.preprocess_batch(
            raw,
            self.config.shards.rows_per_shard,
            self.config.shards.max_shards,
            &self.config.shards.directory,
            &self.config.shards.base_name,
            Some(&encoder),
        )?;
        info!(
            dir = %self.config.shard_dir().display(),
            shards = report.shards_written,
            rows = report.rows_written,
            "Preprocessed raw table"
        );
        Ok(report)
    }

    /// Reads the configured shard set back into one table.
    pub fn load(&self) -> Result<Table> {
        self.shards
            .load(&self.config.shards.base_name, &self.config.shards.directory)
    }

    /// A backing store over the configured shard set.
    pub fn shard_store(&self) -> ShardedTableStore {
        ShardedTableStore::new(
            ShardedFileStore::new(
                self.storage.clone(),
                self.compression,
                self.config.shards.compression_level,
            ),
            self.config.shards.base_name.clone(),
            self.config.shards.directory.clone(),
        )
    }

    /// Opens the configured database.
    pub fn sql_store(&self) -> Result<SqlStore> {
        SqlStore::from_config(&self.config.database)
    }

    /// Copies the configured shard set into the database.
    pub fn import_into_database(&self) -> Result<usize> {
        let mut store = self.sql_store()?;
        store.import_shards(
            &self.shards,
            &self.config.shards.base_name,
            &self.config.shards.directory,
        )
    }

    /// Batch generator over the shard set.
    pub fn shard_generator(&self) -> Result<BatchGenerator<ShardedTableStore>> {
        BatchGenerator::new(self.shard_store(), self.generator_options()?)
    }

    /// Batch generator over the database.
    pub fn sql_generator(&self) -> Result<BatchGenerator<SqlStore>> {
        BatchGenerator::new(self.sql_store()?, self.generator_options()?)
    }

    pub fn generator_options(&self) -> Result<GeneratorOptions> {
        GeneratorOptions::from_config(&self.config.generator, self.schema.clone())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn shards(&self) -> &ShardedFileStore {
        &self.shards
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// On-disk location of the shard set.
    pub fn shard_dir(&self) -> PathBuf {
        self.config.shard_dir()
    }
}
