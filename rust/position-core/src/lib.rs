// rust/position-core/src/lib.rs

//! Position Core
//!
//! Turns chess positions into fixed-width boolean feature vectors, stores
//! encoded tables as ordered shard files, and serves shuffled fixed-size
//! training batches from a keyed backing store (SQLite or a shard set).

pub mod config;
pub mod error;
pub mod storage;
pub mod table;

// Re-export commonly used types for convenience
pub use config::PipelineConfig;
pub use error::{DataError, Result};
pub use storage::{LocalStorage, StorageBackend, StorageReader, StorageWriter};
pub use table::{Column, ColumnData, DType, Table};

pub mod position;
pub use position::{encode, encode_table, FeatureSchema, FeatureVector, Position, TableEncoder};

pub mod shards;
pub use shards::{CompressionType, PreprocessReport, ShardHeader, ShardedFileStore};

pub mod store;
pub use store::{BackingStore, KeyRange, ShardedTableStore, SqlStore};

pub mod dataset;
pub use dataset::{Batch, BatchGenerator, FeatureSource, GeneratorOptions};

pub mod normalize;
pub use normalize::{destandardize, standardize, Standardizer};

pub mod pipeline;
pub use pipeline::Pipeline;
