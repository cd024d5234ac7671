// rust/position-core/src/dataset/mod.rs

//! Batched training data over a [`BackingStore`](crate::store::BackingStore).
//!
//! # Example
//!
//! ```no_run
//! use position_core::dataset::{BatchGenerator, FeatureSource, GeneratorOptions};
//! use position_core::position::FeatureSchema;
//! use position_core::store::{KeyRange, SqlStore};
//!
//! let store = SqlStore::open("data/positions.db", "positions", "index")?;
//! let options = GeneratorOptions {
//!     batch_size: 256,
//!     shuffle: true,
//!     seed: Some(7),
//!     key_range: KeyRange::new(0, 1_000_000)?,
//!     features: FeatureSource::Encoded(FeatureSchema::canonical()),
//!     target_columns: vec!["Evaluation".to_string()],
//! };
//!
//! let mut generator = BatchGenerator::new(store, options)?;
//! for batch in generator.iter() {
//!     let batch = batch?;
//!     let x = batch.feature_matrix()?;
//!     let y = batch.target_matrix()?;
//!     // train on (x, y)
//! }
//! generator.on_epoch_end()?;
//! # Ok::<(), position_core::DataError>(())
//! ```

mod generator;

pub use generator::{Batch, BatchGenerator, FeatureSource, GeneratorOptions};
