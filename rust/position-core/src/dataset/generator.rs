// rust/position-core/src/dataset/generator.rs

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::{FeatureMode, GeneratorConfig};
use crate::error::{DataError, Result};
use crate::position::{encode_fens, FeatureSchema};
use crate::store::{BackingStore, KeyRange};
use crate::table::{DType, Table};

/// Where batch features come from.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureSource {
    /// The store holds the schema's feature columns, as Bool or 0/1 integers.
    Encoded(FeatureSchema),
    /// The store holds FEN text in `fen_column`; each batch is encoded on
    /// the fly into the schema's columns.
    Raw {
        fen_column: String,
        schema: FeatureSchema,
    },
}

impl FeatureSource {
    pub fn schema(&self) -> &FeatureSchema {
        match self {
            Self::Encoded(schema) => schema,
            Self::Raw { schema, .. } => schema,
        }
    }

    fn query_columns(&self) -> Vec<String> {
        match self {
            Self::Encoded(schema) => schema.columns().to_vec(),
            Self::Raw { fen_column, .. } => vec![fen_column.clone()],
        }
    }
}

/// Generator options.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    pub batch_size: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub key_range: KeyRange,
    pub features: FeatureSource,
    pub target_columns: Vec<String>,
}

impl GeneratorOptions {
    /// Builds options from the `[generator]` config section and a schema.
    pub fn from_config(config: &GeneratorConfig, schema: FeatureSchema) -> Result<Self> {
        let features = match config.features {
            FeatureMode::Encoded => FeatureSource::Encoded(schema),
            FeatureMode::Raw => FeatureSource::Raw {
                fen_column: config.fen_column.clone(),
                schema,
            },
        };
        Ok(Self {
            batch_size: config.batch_size,
            shuffle: config.shuffle,
            seed: config.seed,
            key_range: KeyRange::new(config.min_row, config.max_row)?,
            features,
            target_columns: config.target_columns.clone(),
        })
    }
}

/// One batch: keys in epoch order, with features and targets aligned to them
/// row for row.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub index: usize,
    pub keys: Vec<i64>,
    pub features: Table,
    pub targets: Table,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Row-major `f32` feature matrix, `len() x feature count`.
    pub fn feature_matrix(&self) -> Result<Vec<f32>> {
        self.features.to_f32_matrix()
    }

    /// Row-major `f32` target matrix, `len() x target count`.
    pub fn target_matrix(&self) -> Result<Vec<f32>> {
        self.targets.to_f32_matrix()
    }
}

/// Serves fixed-size batches of (features, targets) from a keyed store.
///
/// The row count is taken once at construction and fixes `len()` for the
/// generator's lifetime. Each epoch fetches the key list again and, when
/// shuffling, permutes it; `get_batch` slices that list and fetches the rows.
/// The trailing partial batch is never served.
pub struct BatchGenerator<S> {
    store: S,
    options: GeneratorOptions,
    feature_columns: Vec<String>,
    row_count: u64,
    keys: Vec<i64>,
    epoch: u64,
    rng: StdRng,
}

impl<S: BackingStore> BatchGenerator<S> {
    /// Counts the rows in range and prepares the first epoch.
    ///
    /// # Errors
    ///
    /// `Config` for a zero batch size or an inverted key range;
    /// `IndexConsistency` if the store returns duplicate or out-of-range keys;
    /// store errors are passed through.
    pub fn new(mut store: S, options: GeneratorOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(DataError::config("batch size must be greater than 0"));
        }
        options.key_range.validate()?;

        let row_count = store.row_count(options.key_range)?;
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let feature_columns = options.features.query_columns();

        let mut generator = Self {
            store,
            options,
            feature_columns,
            row_count,
            keys: Vec::new(),
            epoch: 0,
            rng,
        };
        generator.prepare_epoch()?;

        info!(
            rows = row_count,
            batches = generator.len(),
            batch_size = generator.options.batch_size,
            shuffle = generator.options.shuffle,
            "Batch generator ready"
        );
        Ok(generator)
    }

    /// Starts a new epoch: refetches the key list and reshuffles it when
    /// shuffling is on. On error the previous epoch's order is kept.
    pub fn on_epoch_end(&mut self) -> Result<()> {
        self.prepare_epoch()?;
        self.epoch += 1;
        debug!(epoch = self.epoch, "Started new epoch");
        Ok(())
    }

    fn prepare_epoch(&mut self) -> Result<()> {
        let range = self.options.key_range;
        let mut keys = self.store.fetch_keys(range)?;

        let mut seen = HashSet::with_capacity(keys.len());
        for &key in &keys {
            if !range.contains(key) {
                return Err(DataError::index_consistency(format!(
                    "store returned key {key} outside [{}, {}]",
                    range.min, range.max
                )));
            }
            if !seen.insert(key) {
                return Err(DataError::index_consistency(format!(
                    "store returned key {key} more than once"
                )));
            }
        }

        if keys.len() as u64 != self.row_count {
            warn!(
                expected = self.row_count,
                actual = keys.len(),
                "Key count differs from the row count taken at construction"
            );
        }

        if self.options.shuffle {
            keys.shuffle(&mut self.rng);
        }
        self.keys = keys;
        Ok(())
    }

    /// Number of full batches per epoch.
    pub fn len(&self) -> usize {
        (self.row_count / self.options.batch_size as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.options.batch_size
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Epochs completed through `on_epoch_end`; 0 before the first call.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The current epoch's key order.
    pub fn key_order(&self) -> &[i64] {
        &self.keys
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.options.features.schema()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Fetches batch `index` of the current epoch with one feature query and
    /// one target query.
    ///
    /// # Errors
    ///
    /// `IndexConsistency` if `index >= len()`, if the key list is shorter than
    /// the batch requires, or if a store response is missing or repeats a key.
    pub fn get_batch(&mut self, index: usize) -> Result<Batch> {
        let len = self.len();
        if index >= len {
            return Err(DataError::index_consistency(format!(
                "batch {index} out of range for {len} batches"
            )));
        }

        let batch_size = self.options.batch_size;
        let start = index * batch_size;
        let end = start + batch_size;
        if end > self.keys.len() {
            return Err(DataError::index_consistency(format!(
                "batch {index} needs keys {start}..{end} but the epoch holds {} keys",
                self.keys.len()
            )));
        }
        let keys = self.keys[start..end].to_vec();

        let fetched = self
            .store
            .fetch_columns(&keys, &self.feature_columns)?
            .reindex(&keys)?;
        let targets = self
            .store
            .fetch_columns(&keys, &self.options.target_columns)?
            .reindex(&keys)?;

        let features = match &self.options.features {
            FeatureSource::Encoded(schema) => {
                fetched.project(schema.columns())?.recast_all(DType::Bool)?
            }
            FeatureSource::Raw { fen_column, schema } => {
                let fens = fetched.column(fen_column)?.as_text()?;
                encode_fens(&keys, fens, schema)?
            }
        };

        debug!(index, rows = keys.len(), "Fetched batch");
        Ok(Batch {
            index,
            keys,
            features,
            targets,
        })
    }

    /// Every batch of the current epoch, in order.
    pub fn iter(&mut self) -> impl Iterator<Item = Result<Batch>> + '_ {
        let len = self.len();
        (0..len).map(move |i| self.get_batch(i))
    }
}
