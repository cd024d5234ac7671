// rust/position-core/src/table.rs

//! Column-oriented tables with row-index labels.
//!
//! A `Table` is the unit exchanged between the encoder, the shard store, the
//! backing stores and the batch generator. Columns keep their declared order
//! and dtype, and every row carries an `i64` index label inherited from the
//! source data. All reshaping is explicit: projection and recasting fail on a
//! missing column instead of creating one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Element type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Bool,
    Int,
    Float,
    Text,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::Int => "int",
            DType::Float => "float",
            DType::Text => "text",
        };
        f.write_str(name)
    }
}

/// Typed column storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn empty(dtype: DType) -> Self {
        match dtype {
            DType::Bool => ColumnData::Bool(Vec::new()),
            DType::Int => ColumnData::Int(Vec::new()),
            DType::Float => ColumnData::Float(Vec::new()),
            DType::Text => ColumnData::Text(Vec::new()),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::Bool(_) => DType::Bool,
            ColumnData::Int(_) => DType::Int,
            ColumnData::Float(_) => DType::Float,
            ColumnData::Text(_) => DType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn gather(&self, rows: &[usize]) -> Self {
        match self {
            ColumnData::Bool(v) => ColumnData::Bool(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Int(v) => ColumnData::Int(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Float(v) => ColumnData::Float(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    fn slice(&self, range: Range<usize>) -> Self {
        match self {
            ColumnData::Bool(v) => ColumnData::Bool(v[range].to_vec()),
            ColumnData::Int(v) => ColumnData::Int(v[range].to_vec()),
            ColumnData::Float(v) => ColumnData::Float(v[range].to_vec()),
            ColumnData::Text(v) => ColumnData::Text(v[range].to_vec()),
        }
    }

    fn append(&mut self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a.extend_from_slice(b),
            (ColumnData::Int(a), ColumnData::Int(b)) => a.extend_from_slice(b),
            (ColumnData::Float(a), ColumnData::Float(b)) => a.extend_from_slice(b),
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }

    fn value_as_f32(&self, row: usize) -> Option<f32> {
        match self {
            ColumnData::Bool(v) => Some(if v[row] { 1.0 } else { 0.0 }),
            ColumnData::Int(v) => Some(v[row] as f32),
            ColumnData::Float(v) => Some(v[row] as f32),
            ColumnData::Text(_) => None,
        }
    }

    /// Converts to another dtype, failing on the first value that has no
    /// exact representation in the target type.
    fn cast(&self, target: DType) -> std::result::Result<ColumnData, String> {
        if self.dtype() == target {
            return Ok(self.clone());
        }

        let cast = match (self, target) {
            (ColumnData::Int(v), DType::Bool) => ColumnData::Bool(
                v.iter()
                    .map(|&x| match x {
                        0 => Ok(false),
                        1 => Ok(true),
                        other => Err(format!("value {other} is not 0 or 1")),
                    })
                    .collect::<std::result::Result<_, _>>()?,
            ),
            (ColumnData::Int(v), DType::Float) => {
                ColumnData::Float(v.iter().map(|&x| x as f64).collect())
            }
            (ColumnData::Bool(v), DType::Int) => {
                ColumnData::Int(v.iter().map(|&b| i64::from(b)).collect())
            }
            (ColumnData::Bool(v), DType::Float) => {
                ColumnData::Float(v.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect())
            }
            (ColumnData::Float(v), DType::Int) => ColumnData::Int(
                v.iter()
                    .map(|&x| {
                        if x.is_finite() && x.fract() == 0.0 {
                            Ok(x as i64)
                        } else {
                            Err(format!("value {x} is not integral"))
                        }
                    })
                    .collect::<std::result::Result<_, _>>()?,
            ),
            (ColumnData::Float(v), DType::Bool) => ColumnData::Bool(
                v.iter()
                    .map(|&x| {
                        if x == 0.0 {
                            Ok(false)
                        } else if x == 1.0 {
                            Ok(true)
                        } else {
                            Err(format!("value {x} is not 0 or 1"))
                        }
                    })
                    .collect::<std::result::Result<_, _>>()?,
            ),
            (ColumnData::Text(v), DType::Int) => ColumnData::Int(
                v.iter()
                    .map(|s| {
                        s.trim()
                            .parse::<i64>()
                            .map_err(|_| format!("value '{s}' is not an integer"))
                    })
                    .collect::<std::result::Result<_, _>>()?,
            ),
            (ColumnData::Text(v), DType::Float) => ColumnData::Float(
                v.iter()
                    .map(|s| {
                        s.trim()
                            .parse::<f64>()
                            .map_err(|_| format!("value '{s}' is not a number"))
                    })
                    .collect::<std::result::Result<_, _>>()?,
            ),
            (ColumnData::Text(v), DType::Bool) => ColumnData::Bool(
                v.iter()
                    .map(|s| match s.trim() {
                        "true" | "True" | "1" => Ok(true),
                        "false" | "False" | "0" => Ok(false),
                        other => Err(format!("value '{other}' is not a boolean")),
                    })
                    .collect::<std::result::Result<_, _>>()?,
            ),
            (ColumnData::Bool(v), DType::Text) => {
                ColumnData::Text(v.iter().map(|b| b.to_string()).collect())
            }
            (ColumnData::Int(v), DType::Text) => {
                ColumnData::Text(v.iter().map(|x| x.to_string()).collect())
            }
            (ColumnData::Float(v), DType::Text) => {
                ColumnData::Text(v.iter().map(|x| x.to_string()).collect())
            }
            _ => unreachable!("identical dtypes handled above"),
        };

        Ok(cast)
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bool(&self) -> Result<&[bool]> {
        match &self.data {
            ColumnData::Bool(v) => Ok(v),
            other => Err(self.dtype_mismatch(DType::Bool, other.dtype())),
        }
    }

    pub fn as_int(&self) -> Result<&[i64]> {
        match &self.data {
            ColumnData::Int(v) => Ok(v),
            other => Err(self.dtype_mismatch(DType::Int, other.dtype())),
        }
    }

    pub fn as_float(&self) -> Result<&[f64]> {
        match &self.data {
            ColumnData::Float(v) => Ok(v),
            other => Err(self.dtype_mismatch(DType::Float, other.dtype())),
        }
    }

    pub fn as_text(&self) -> Result<&[String]> {
        match &self.data {
            ColumnData::Text(v) => Ok(v),
            other => Err(self.dtype_mismatch(DType::Text, other.dtype())),
        }
    }

    /// Numeric view of the column as `f64`, for the normalizer.
    pub fn to_f64(&self) -> Result<Vec<f64>> {
        match &self.data {
            ColumnData::Int(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ColumnData::Float(v) => Ok(v.clone()),
            ColumnData::Bool(v) => Ok(v.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()),
            ColumnData::Text(_) => Err(self.dtype_mismatch(DType::Float, DType::Text)),
        }
    }

    fn dtype_mismatch(&self, expected: DType, actual: DType) -> DataError {
        DataError::config(format!(
            "column '{}' has dtype {actual}, expected {expected}",
            self.name
        ))
    }
}

/// An ordered set of equally long columns plus one index label per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    index: Vec<i64>,
    columns: Vec<Column>,
}

impl Table {
    /// Creates a table with the given row labels and no columns.
    pub fn new(index: Vec<i64>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Builder form of [`Table::push_column`].
    pub fn with_column(mut self, name: impl Into<String>, data: ColumnData) -> Result<Self> {
        self.push_column(name, data)?;
        Ok(self)
    }

    /// Appends a column. Its length must match the row count and its name
    /// must be new.
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if data.len() != self.index.len() {
            return Err(DataError::config(format!(
                "column '{name}' has {} rows, table has {}",
                data.len(),
                self.index.len()
            )));
        }
        if self.has_column(&name) {
            return Err(DataError::config(format!("column '{name}' already exists")));
        }
        self.columns.push(Column::new(name, data));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Column names paired with their dtypes, in table order.
    pub fn layout(&self) -> Vec<(String, DType)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.dtype()))
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DataError::column_not_found(name))
    }

    /// Selects `names` in the given order.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut projected = Table::new(self.index.clone());
        for name in names {
            let column = self.column(name.as_ref())?;
            projected.push_column(column.name.clone(), column.data.clone())?;
        }
        Ok(projected)
    }

    /// Returns a copy with column `name` converted to `dtype`.
    pub fn recast(&self, name: &str, dtype: DType) -> Result<Table> {
        let position = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DataError::column_not_found(name))?;

        let mut recast = self.clone();
        recast.columns[position].data = self.columns[position]
            .data
            .cast(dtype)
            .map_err(|e| DataError::config(format!("cannot recast column '{name}' to {dtype}: {e}")))?;
        Ok(recast)
    }

    /// Converts every column to `dtype`.
    pub fn recast_all(&self, dtype: DType) -> Result<Table> {
        let mut recast = Table::new(self.index.clone());
        for column in &self.columns {
            let data = column.data.cast(dtype).map_err(|e| {
                DataError::config(format!(
                    "cannot recast column '{}' to {dtype}: {e}",
                    column.name
                ))
            })?;
            recast.columns.push(Column::new(column.name.clone(), data));
        }
        Ok(recast)
    }

    /// Rows `range`, clamped to the table length.
    pub fn slice(&self, range: Range<usize>) -> Table {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Table {
            index: self.index[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.slice(start..end)))
                .collect(),
        }
    }

    /// Keeps the rows where `mask` is true.
    pub fn filter(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.len() {
            return Err(DataError::config(format!(
                "filter mask has {} entries, table has {} rows",
                mask.len(),
                self.len()
            )));
        }
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        Ok(self.take_rows(&rows))
    }

    /// Reorders the table so that its rows follow `keys`, matched against the
    /// index labels.
    ///
    /// # Errors
    ///
    /// Returns `IndexConsistency` if a key is absent, if `keys` repeats a key,
    /// or if the table itself carries duplicate labels for a requested key.
    pub fn reindex(&self, keys: &[i64]) -> Result<Table> {
        let mut positions: HashMap<i64, usize> = HashMap::with_capacity(self.len());
        let mut duplicated: HashSet<i64> = HashSet::new();
        for (row, &label) in self.index.iter().enumerate() {
            if positions.insert(label, row).is_some() {
                duplicated.insert(label);
            }
        }

        let mut seen: HashSet<i64> = HashSet::with_capacity(keys.len());
        let mut rows = Vec::with_capacity(keys.len());
        for &key in keys {
            if !seen.insert(key) {
                return Err(DataError::index_consistency(format!(
                    "key {key} requested more than once"
                )));
            }
            if duplicated.contains(&key) {
                return Err(DataError::index_consistency(format!(
                    "key {key} appears more than once in the fetched rows"
                )));
            }
            let row = positions.get(&key).ok_or_else(|| {
                DataError::index_consistency(format!("key {key} missing from the fetched rows"))
            })?;
            rows.push(*row);
        }

        Ok(self.take_rows(&rows))
    }

    /// Concatenates tables row-wise. All tables must share one column layout.
    pub fn concat(tables: &[Table]) -> Result<Table> {
        let Some(first) = tables.first() else {
            return Ok(Table::default());
        };

        let layout = first.layout();
        let mut combined = first.clone();
        for (i, table) in tables.iter().enumerate().skip(1) {
            if table.layout() != layout {
                return Err(DataError::config(format!(
                    "table {i} does not share the column layout of table 0"
                )));
            }
            combined.index.extend_from_slice(&table.index);
            for (target, source) in combined.columns.iter_mut().zip(&table.columns) {
                // Layout equality guarantees matching dtypes.
                target.data.append(&source.data);
            }
        }
        Ok(combined)
    }

    /// Row-major `f32` matrix of all columns, for handing a batch to a model.
    pub fn to_f32_matrix(&self) -> Result<Vec<f32>> {
        let mut matrix = Vec::with_capacity(self.len() * self.columns.len());
        for row in 0..self.len() {
            for column in &self.columns {
                let value = column.data.value_as_f32(row).ok_or_else(|| {
                    DataError::config(format!(
                        "column '{}' is text and has no numeric representation",
                        column.name
                    ))
                })?;
                matrix.push(value);
            }
        }
        Ok(matrix)
    }

    fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.gather(rows)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![10, 11, 12, 13])
            .with_column("fen", ColumnData::Text(vec!["a".into(), "b".into(), "c".into(), "d".into()]))
            .unwrap()
            .with_column("flag", ColumnData::Int(vec![0, 1, 1, 0]))
            .unwrap()
            .with_column("Evaluation", ColumnData::Int(vec![-5, 20, 0, 7]))
            .unwrap()
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut table = Table::new(vec![1, 2]);
        let result = table.push_column("x", ColumnData::Int(vec![1]));
        assert!(matches!(result, Err(DataError::Config { .. })));
    }

    #[test]
    fn test_push_column_duplicate_name() {
        let mut table = Table::new(vec![1]);
        table.push_column("x", ColumnData::Int(vec![1])).unwrap();
        assert!(table.push_column("x", ColumnData::Bool(vec![true])).is_err());
    }

    #[test]
    fn test_project_orders_and_fails_on_missing() {
        let table = sample();
        let projected = table.project(&["Evaluation", "fen"]).unwrap();
        assert_eq!(projected.column_names(), vec!["Evaluation", "fen"]);
        assert_eq!(projected.index(), table.index());

        let missing = table.project(&["fen", "nope"]);
        assert!(matches!(missing, Err(DataError::ColumnNotFound { name }) if name == "nope"));
    }

    #[test]
    fn test_recast_int_to_bool() {
        let table = sample().recast("flag", DType::Bool).unwrap();
        assert_eq!(
            table.column("flag").unwrap().as_bool().unwrap(),
            &[false, true, true, false]
        );

        let err = sample().recast("Evaluation", DType::Bool);
        assert!(err.is_err());

        let missing = sample().recast("absent", DType::Int);
        assert!(matches!(missing, Err(DataError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_recast_text_to_int() {
        let table = Table::new(vec![0, 1])
            .with_column("e", ColumnData::Text(vec!["+56".into(), "-3".into()]))
            .unwrap();
        let recast = table.recast("e", DType::Int).unwrap();
        assert_eq!(recast.column("e").unwrap().as_int().unwrap(), &[56, -3]);
    }

    #[test]
    fn test_slice_clamps() {
        let table = sample();
        let tail = table.slice(2..10);
        assert_eq!(tail.index(), &[12, 13]);
        assert_eq!(tail.len(), 2);
        assert!(table.slice(7..9).is_empty());
    }

    #[test]
    fn test_reindex_follows_key_order() {
        let table = sample();
        let reordered = table.reindex(&[13, 10, 12]).unwrap();
        assert_eq!(reordered.index(), &[13, 10, 12]);
        assert_eq!(
            reordered.column("Evaluation").unwrap().as_int().unwrap(),
            &[7, -5, 0]
        );
    }

    #[test]
    fn test_reindex_detects_missing_and_duplicate_keys() {
        let table = sample();
        assert!(matches!(
            table.reindex(&[10, 99]),
            Err(DataError::IndexConsistency { .. })
        ));
        assert!(matches!(
            table.reindex(&[10, 10]),
            Err(DataError::IndexConsistency { .. })
        ));

        let doubled = Table::concat(&[table.clone(), table]).unwrap();
        assert!(matches!(
            doubled.reindex(&[11]),
            Err(DataError::IndexConsistency { .. })
        ));
    }

    #[test]
    fn test_concat_preserves_order() {
        let table = sample();
        let parts = vec![table.slice(0..1), table.slice(1..3), table.slice(3..4)];
        let combined = Table::concat(&parts).unwrap();
        assert_eq!(combined, table);
    }

    #[test]
    fn test_concat_rejects_layout_mismatch() {
        let a = Table::new(vec![1])
            .with_column("x", ColumnData::Int(vec![1]))
            .unwrap();
        let b = Table::new(vec![2])
            .with_column("x", ColumnData::Float(vec![1.0]))
            .unwrap();
        assert!(Table::concat(&[a, b]).is_err());
    }

    #[test]
    fn test_filter() {
        let filtered = sample().filter(&[true, false, false, true]).unwrap();
        assert_eq!(filtered.index(), &[10, 13]);
        assert!(sample().filter(&[true]).is_err());
    }

    #[test]
    fn test_to_f32_matrix() {
        let table = sample().project(&["flag", "Evaluation"]).unwrap();
        let matrix = table.to_f32_matrix().unwrap();
        assert_eq!(matrix, vec![0.0, -5.0, 1.0, 20.0, 1.0, 0.0, 0.0, 7.0]);
        assert!(sample().to_f32_matrix().is_err());
    }
}
