// rust/position-core/src/shards/mod.rs

//! Sharded table files.
//!
//! A logical table is split into row slices, each written to its own file
//! named `zero_pad(index, width) + base_name`. One padding width is used for
//! every shard of a run, so sorting file names lexicographically restores
//! the numeric shard order and `load` can rebuild the original table row for
//! row.
//!
//! # Example
//!
//! ```no_run
//! use position_core::config::StorageConfig;
//! use position_core::shards::{CompressionType, ShardedFileStore};
//! use position_core::storage::LocalStorage;
//! use position_core::table::{ColumnData, Table};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(LocalStorage::new(&StorageConfig::default()).unwrap());
//! let store = ShardedFileStore::new(storage, CompressionType::Lz4, 3);
//!
//! let table = Table::new((0..2500).collect())
//!     .with_column("Evaluation", ColumnData::Int((0..2500).collect()))
//!     .unwrap();
//! let report = store
//!     .preprocess_batch(&table, 1000, 10, Path::new("processed"), "evals.shard", None)
//!     .unwrap();
//! assert_eq!(report.shards_written, 3);
//!
//! let loaded = store.load("evals.shard", Path::new("processed")).unwrap();
//! assert_eq!(loaded, table);
//! ```

mod format;
mod reader;
mod writer;

pub use format::{CompressionType, ShardHeader};
pub use reader::ShardReader;
pub use writer::ShardWriter;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{DataError, Result};
use crate::position::TableEncoder;
use crate::storage::StorageBackend;
use crate::table::Table;

/// Decimal digits needed to print `total_shards`, at least 1.
///
/// Equal to `ceil(log10(total_shards + 1))` for every positive count.
pub fn padding_width(total_shards: usize) -> usize {
    let mut width = 1;
    let mut rest = total_shards / 10;
    while rest > 0 {
        width += 1;
        rest /= 10;
    }
    width
}

/// File name of shard `index` for a run padded to `width` digits.
pub fn shard_file_name(index: usize, width: usize, base_name: &str) -> String {
    format!("{index:0width$}{base_name}")
}

/// Outcome of a [`ShardedFileStore::preprocess_batch`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessReport {
    pub shards_written: usize,
    pub padding_width: usize,
    pub rows_written: usize,
    pub files: Vec<PathBuf>,
}

/// Writes tables as shard sets and reads them back in order.
pub struct ShardedFileStore {
    writer: ShardWriter,
    reader: ShardReader,
    storage: Arc<dyn StorageBackend>,
}

impl ShardedFileStore {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        compression: CompressionType,
        compression_level: i32,
    ) -> Self {
        Self {
            writer: ShardWriter::new(storage.clone(), compression, compression_level),
            reader: ShardReader::new(storage.clone()),
            storage,
        }
    }

    /// Writes `table` as shard `shard_index` of a run of `total_shards`, to
    /// `dir/zero_pad(shard_index, padding_width(total_shards)) + base_name`.
    ///
    /// # Errors
    ///
    /// `Config` for an empty or path-like `base_name` or an index outside
    /// `0..total_shards`; `Storage` on I/O failure.
    pub fn save(
        &self,
        table: &Table,
        shard_index: usize,
        total_shards: usize,
        base_name: &str,
        dir: &Path,
    ) -> Result<PathBuf> {
        check_base_name(base_name)?;
        if shard_index >= total_shards {
            return Err(DataError::config(format!(
                "shard index {shard_index} is outside a run of {total_shards} shards"
            )));
        }

        let name = shard_file_name(shard_index, padding_width(total_shards), base_name);
        let path = dir.join(name);

        self.storage.create_dir_all(dir)?;
        let bytes = self.writer.write(table, &path)?;

        debug!(
            path = %path.display(),
            rows = table.len(),
            bytes,
            compression = %self.writer.compression(),
            "Wrote shard"
        );
        Ok(path)
    }

    /// File names in `dir` that contain `base_name`, sorted.
    ///
    /// Any file whose name contains `base_name` is taken as part of the set,
    /// so each data set needs a directory of its own. Hidden files (in-flight
    /// temp files) are skipped.
    pub fn list_shards(&self, base_name: &str, dir: &Path) -> Result<Vec<String>> {
        check_base_name(base_name)?;
        let mut names: Vec<String> = self
            .storage
            .list(dir)?
            .into_iter()
            .filter(|name| name.contains(base_name) && !name.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Reads one shard file.
    pub fn read_shard(&self, path: &Path) -> Result<Table> {
        self.reader.read(path)
    }

    /// Rebuilds the table stored under `base_name` in `dir`, concatenating
    /// shards in file-name order.
    ///
    /// Every file whose name contains `base_name` is read, unrelated files
    /// included, except dot-prefixed names: those are in-flight temp files
    /// from [`save`](Self::save) and are never part of the set.
    ///
    /// # Errors
    ///
    /// `Storage` if no shard matches or a file cannot be read;
    /// `Serialization` if a shard is corrupt or its columns differ from the
    /// first shard's.
    pub fn load(&self, base_name: &str, dir: &Path) -> Result<Table> {
        let names = self.list_shards(base_name, dir)?;
        if names.is_empty() {
            return Err(DataError::storage(
                dir,
                format!("no shards matching '{base_name}'"),
            ));
        }

        let mut tables = Vec::with_capacity(names.len());
        for name in &names {
            let table = self.reader.read(&dir.join(name))?;
            if let Some(first) = tables.first().map(Table::layout) {
                if table.layout() != first {
                    return Err(DataError::serialization(format!(
                        "shard '{name}' does not share the column layout of '{}'",
                        names[0]
                    )));
                }
            }
            tables.push(table);
        }

        let combined = Table::concat(&tables)?;
        info!(
            base_name,
            dir = %dir.display(),
            shards = names.len(),
            rows = combined.len(),
            "Loaded shard set"
        );
        Ok(combined)
    }

    /// Splits `table` into batches of `batch_size` rows and writes each as
    /// one shard, encoding it first when `encoder` is given.
    ///
    /// The shard count starts at `len / batch_size + 1` and the padding width
    /// is taken from that count; only afterwards is the count reduced by one
    /// when `len` is an exact multiple of `batch_size`.
    ///
    /// # Errors
    ///
    /// `Config` if `batch_size` is 0 or the starting count exceeds
    /// `max_batches`; encoding and storage errors are passed through.
    pub fn preprocess_batch(
        &self,
        table: &Table,
        batch_size: usize,
        max_batches: usize,
        dir: &Path,
        base_name: &str,
        encoder: Option<&TableEncoder>,
    ) -> Result<PreprocessReport> {
        if batch_size == 0 {
            return Err(DataError::config("batch size must be greater than 0"));
        }
        check_base_name(base_name)?;

        let naive_batches = table.len() / batch_size + 1;
        if naive_batches > max_batches {
            return Err(DataError::config(format!(
                "{} rows at {batch_size} rows per shard need up to {naive_batches} shards, \
                 more than the allowed {max_batches}",
                table.len()
            )));
        }
        let width = padding_width(naive_batches);
        let batches = if table.len() % batch_size == 0 {
            naive_batches - 1
        } else {
            naive_batches
        };

        let mut report = PreprocessReport {
            shards_written: 0,
            padding_width: width,
            rows_written: 0,
            files: Vec::with_capacity(batches),
        };

        for index in 0..batches {
            let start = index * batch_size;
            let slice = table.slice(start..start + batch_size);
            let shard = match encoder {
                Some(encoder) => encoder.encode(&slice)?,
                None => slice,
            };
            let path = self.save(&shard, index, naive_batches, base_name, dir)?;

            report.shards_written += 1;
            report.rows_written += shard.len();
            report.files.push(path);
        }

        info!(
            base_name,
            dir = %dir.display(),
            shards = report.shards_written,
            rows = report.rows_written,
            width,
            "Preprocessed table into shards"
        );
        Ok(report)
    }
}

fn check_base_name(base_name: &str) -> Result<()> {
    if base_name.is_empty() {
        return Err(DataError::config("shard base name must not be empty"));
    }
    if base_name.contains(['/', '\\']) {
        return Err(DataError::config(format!(
            "shard base name '{base_name}' must not contain path separators"
        )));
    }
    Ok(())
}
