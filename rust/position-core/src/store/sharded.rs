// rust/position-core/src/store/sharded.rs

//! Backing store over a directory of shard files.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use super::traits::{BackingStore, KeyRange};
use crate::error::{DataError, Result};
use crate::shards::ShardedFileStore;
use crate::table::Table;

/// Serves rows from a shard set, keyed by the row labels stored in the
/// shards. The whole set is loaded on first use and kept in memory.
pub struct ShardedTableStore {
    shards: ShardedFileStore,
    base_name: String,
    dir: PathBuf,
    loaded: Option<Loaded>,
}

struct Loaded {
    table: Table,
    rows: HashMap<i64, usize>,
}

impl ShardedTableStore {
    pub fn new(
        shards: ShardedFileStore,
        base_name: impl Into<String>,
        dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            shards,
            base_name: base_name.into(),
            dir: dir.into(),
            loaded: None,
        }
    }

    /// Wraps a table that is already in memory.
    ///
    /// # Errors
    ///
    /// `IndexConsistency` if the table repeats a row label.
    pub fn from_table(shards: ShardedFileStore, table: Table) -> Result<Self> {
        let loaded = Loaded::new(table)?;
        Ok(Self {
            shards,
            base_name: String::new(),
            dir: PathBuf::new(),
            loaded: Some(loaded),
        })
    }

    fn loaded(&mut self) -> Result<&Loaded> {
        if self.loaded.is_none() {
            let table = self.shards.load(&self.base_name, &self.dir)?;
            self.loaded = Some(Loaded::new(table)?);
        }
        self.loaded
            .as_ref()
            .ok_or_else(|| DataError::backing_store("shard set failed to load"))
    }
}

impl Loaded {
    fn new(table: Table) -> Result<Self> {
        let mut rows = HashMap::with_capacity(table.len());
        for (row, &key) in table.index().iter().enumerate() {
            if rows.insert(key, row).is_some() {
                return Err(DataError::index_consistency(format!(
                    "key {key} appears more than once in the shard set"
                )));
            }
        }
        debug!(rows = table.len(), "Indexed shard rows");
        Ok(Self { table, rows })
    }
}

impl BackingStore for ShardedTableStore {
    fn row_count(&mut self, range: KeyRange) -> Result<u64> {
        let loaded = self.loaded()?;
        Ok(loaded.rows.keys().filter(|&&k| range.contains(k)).count() as u64)
    }

    fn fetch_keys(&mut self, range: KeyRange) -> Result<Vec<i64>> {
        let loaded = self.loaded()?;
        let mut keys: Vec<i64> = loaded
            .rows
            .keys()
            .copied()
            .filter(|&k| range.contains(k))
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    fn fetch_columns(&mut self, keys: &[i64], columns: &[String]) -> Result<Table> {
        let loaded = self.loaded()?;
        // Unknown keys are left out, as a relational `IN` filter would.
        let present: Vec<i64> = keys
            .iter()
            .copied()
            .filter(|k| loaded.rows.contains_key(k))
            .collect();
        loaded.table.project(columns)?.reindex(&present)
    }
}
