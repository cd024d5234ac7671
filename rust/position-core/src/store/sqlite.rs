// rust/position-core/src/store/sqlite.rs

//! Relational backing store on SQLite.

use std::path::Path;
use std::rc::Rc;

use rusqlite::types::{Value, ValueRef};
use rusqlite::vtab::array;
use rusqlite::{params, params_from_iter, Connection};
use tracing::{debug, info};

use super::traits::{BackingStore, KeyRange};
use crate::config::DatabaseConfig;
use crate::error::{DataError, Result};
use crate::position::is_identifier;
use crate::shards::ShardedFileStore;
use crate::table::{ColumnData, DType, Table};

/// One table of a SQLite database, keyed by an integer column.
///
/// Feature columns are stored as `INTEGER` 0/1, so callers that need
/// booleans recast after fetching.
pub struct SqlStore {
    conn: Connection,
    table: String,
    key_column: String,
}

impl SqlStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, table: &str, key_column: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DataError::storage_with_source(parent, "failed to create database directory", e)
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|e| {
            DataError::backing_store_with_source(
                format!("failed to open database {}", path.display()),
                e,
            )
        })?;
        Self::from_connection(conn, table, key_column)
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::open(&config.path, &config.table, &config.key_column)
    }

    /// Wraps an open connection.
    ///
    /// # Errors
    ///
    /// `Config` if `table` or `key_column` is not a plain identifier.
    pub fn from_connection(conn: Connection, table: &str, key_column: &str) -> Result<Self> {
        for (what, name) in [("table", table), ("key column", key_column)] {
            if !is_identifier(name) {
                return Err(DataError::config(format!(
                    "{what} name '{name}' is not a valid identifier"
                )));
            }
        }
        array::load_module(&conn)?;
        Ok(Self {
            conn,
            table: table.to_string(),
            key_column: key_column.to_string(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Appends `table` to the store's table, creating it from the column
    /// layout if it does not exist yet. Row labels become the key column.
    /// Returns the number of rows inserted.
    pub fn insert_table(&mut self, table: &Table) -> Result<usize> {
        for name in table.column_names() {
            if !is_identifier(name) {
                return Err(DataError::config(format!(
                    "column name '{name}' is not a valid identifier"
                )));
            }
            if name == self.key_column {
                return Err(DataError::config(format!(
                    "column '{name}' collides with the key column"
                )));
            }
        }

        let mut definitions = vec![format!("{} INTEGER PRIMARY KEY", quote(&self.key_column))];
        definitions.extend(
            table
                .columns()
                .iter()
                .map(|c| format!("{} {}", quote(c.name()), sql_type(c.dtype()))),
        );
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(&self.table),
            definitions.join(", ")
        );

        let mut names = vec![quote(&self.key_column)];
        names.extend(table.column_names().into_iter().map(quote));
        let placeholders = vec!["?"; names.len()].join(", ");
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote(&self.table),
            names.join(", ")
        );

        let tx = self.conn.transaction()?;
        tx.execute_batch(&create)?;
        {
            let mut stmt = tx.prepare(&insert)?;
            let mut row_values = Vec::with_capacity(names.len());
            for (row, &key) in table.index().iter().enumerate() {
                row_values.clear();
                row_values.push(Value::Integer(key));
                row_values.extend(table.columns().iter().map(|c| value_at(c.data(), row)));
                stmt.execute(params_from_iter(row_values.iter()))?;
            }
        }
        tx.commit()?;

        debug!(table = %self.table, rows = table.len(), "Inserted rows");
        Ok(table.len())
    }

    /// Loads every shard of a set into the store, one transaction per shard,
    /// in file-name order. Returns the total number of rows inserted.
    pub fn import_shards(
        &mut self,
        shards: &ShardedFileStore,
        base_name: &str,
        dir: &Path,
    ) -> Result<usize> {
        let names = shards.list_shards(base_name, dir)?;
        let mut total = 0;
        for name in &names {
            let table = shards.read_shard(&dir.join(name))?;
            total += self.insert_table(&table)?;
        }
        info!(
            table = %self.table,
            shards = names.len(),
            rows = total,
            "Imported shard set into database"
        );
        Ok(total)
    }

    /// Checks that the table exists and has every named column. SQLite reads
    /// an unknown double-quoted identifier as a string literal, so this has
    /// to happen before any query is built.
    fn ensure_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let sql = format!("PRAGMA table_info({})", quote(&self.table));
        let mut stmt = self.conn.prepare(&sql)?;
        let existing = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        if existing.is_empty() {
            return Err(DataError::backing_store(format!(
                "table '{}' does not exist",
                self.table
            )));
        }
        let required = std::iter::once(self.key_column.as_str())
            .chain(names.iter().map(|n| n.as_ref()));
        for name in required {
            if !existing.iter().any(|c| c == name) {
                return Err(DataError::column_not_found(name));
            }
        }
        Ok(())
    }
}

impl BackingStore for SqlStore {
    fn row_count(&mut self, range: KeyRange) -> Result<u64> {
        self.ensure_columns::<&str>(&[])?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} BETWEEN ?1 AND ?2",
            quote(&self.table),
            quote(&self.key_column)
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params![range.min, range.max], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn fetch_keys(&mut self, range: KeyRange) -> Result<Vec<i64>> {
        self.ensure_columns::<&str>(&[])?;
        let sql = format!(
            "SELECT {key} FROM {} WHERE {key} BETWEEN ?1 AND ?2 ORDER BY {key}",
            quote(&self.table),
            key = quote(&self.key_column)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let keys = stmt
            .query_map(params![range.min, range.max], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(keys)
    }

    fn fetch_columns(&mut self, keys: &[i64], columns: &[String]) -> Result<Table> {
        for name in columns {
            if !is_identifier(name) {
                return Err(DataError::config(format!(
                    "column name '{name}' is not a valid identifier"
                )));
            }
        }
        self.ensure_columns(columns)?;

        let mut selected = vec![quote(&self.key_column)];
        selected.extend(columns.iter().map(|c| quote(c)));
        // Keys bind as one array parameter, so batch size is not bounded by
        // SQLite's host-parameter limit.
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IN rarray(?1)",
            selected.join(", "),
            quote(&self.table),
            quote(&self.key_column)
        );

        let key_values: array::Array =
            Rc::new(keys.iter().copied().map(Value::from).collect::<Vec<Value>>());
        let width = selected.len();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([key_values], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<Vec<Value>>>>()?;

        let mut index = Vec::with_capacity(rows.len());
        let mut values: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for row in rows {
            let mut cells = row.into_iter();
            match cells.next() {
                Some(Value::Integer(key)) => index.push(key),
                other => {
                    return Err(DataError::backing_store(format!(
                        "key column '{}' returned non-integer value {other:?}",
                        self.key_column
                    )))
                }
            }
            for (column, cell) in values.iter_mut().zip(cells) {
                column.push(cell);
            }
        }

        let mut table = Table::new(index);
        for (name, column) in columns.iter().zip(values) {
            table.push_column(name.clone(), column_from_values(name, column)?)?;
        }
        Ok(table)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

fn sql_type(dtype: DType) -> &'static str {
    match dtype {
        DType::Bool | DType::Int => "INTEGER",
        DType::Float => "REAL",
        DType::Text => "TEXT",
    }
}

fn value_at(data: &ColumnData, row: usize) -> Value {
    match data {
        ColumnData::Bool(v) => Value::Integer(i64::from(v[row])),
        ColumnData::Int(v) => Value::Integer(v[row]),
        ColumnData::Float(v) => Value::Real(v[row]),
        ColumnData::Text(v) => Value::Text(v[row].clone()),
    }
}

/// Picks a dtype from the stored values: all integers give `Int`, any real
/// gives `Float`, text gives `Text`. NULLs and blobs are rejected.
fn column_from_values(name: &str, values: Vec<Value>) -> Result<ColumnData> {
    let unsupported = |value: &Value| {
        DataError::backing_store(format!(
            "column '{name}' holds unsupported value {:?}",
            ValueRef::from(value).data_type()
        ))
    };

    if let Some(bad) = values
        .iter()
        .find(|v| matches!(v, Value::Null | Value::Blob(_)))
    {
        return Err(unsupported(bad));
    }

    if values.iter().all(|v| matches!(v, Value::Integer(_))) {
        return Ok(ColumnData::Int(
            values
                .into_iter()
                .map(|v| match v {
                    Value::Integer(i) => i,
                    _ => 0,
                })
                .collect(),
        ));
    }

    if values.iter().any(|v| matches!(v, Value::Text(_))) {
        if let Some(bad) = values.iter().find(|v| !matches!(v, Value::Text(_))) {
            return Err(DataError::backing_store(format!(
                "column '{name}' mixes text with {:?}",
                ValueRef::from(bad).data_type()
            )));
        }
        return Ok(ColumnData::Text(
            values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Text(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ));
    }

    Ok(ColumnData::Float(
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::Integer(i) => Some(i as f64),
                Value::Real(f) => Some(f),
                _ => None,
            })
            .collect(),
    ))
}
