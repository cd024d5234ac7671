// rust/position-core/src/store/traits.rs

//! Backing-store abstraction consumed by the batch generator.

use crate::error::{DataError, Result};
use crate::table::Table;

/// Inclusive range of row keys, `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRange {
    pub min: i64,
    pub max: i64,
}

impl KeyRange {
    /// Builds a range, failing with `Config` if `min > max`.
    pub fn new(min: i64, max: i64) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min > self.max {
            return Err(DataError::config(format!(
                "key range minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, key: i64) -> bool {
        (self.min..=self.max).contains(&key)
    }
}

/// A keyed table source.
///
/// Implementations are owned by exactly one generator and are never shared,
/// so every method takes `&mut self`.
pub trait BackingStore: Send {
    /// Number of rows whose key falls in `range`.
    fn row_count(&mut self, range: KeyRange) -> Result<u64>;

    /// Keys in `range`, in the store's retrieval order.
    fn fetch_keys(&mut self, range: KeyRange) -> Result<Vec<i64>>;

    /// The named columns for `keys`, indexed by key. Row order is not
    /// guaranteed to follow `keys`.
    fn fetch_columns(&mut self, keys: &[i64], columns: &[String]) -> Result<Table>;
}

impl<S: BackingStore + ?Sized> BackingStore for Box<S> {
    fn row_count(&mut self, range: KeyRange) -> Result<u64> {
        (**self).row_count(range)
    }

    fn fetch_keys(&mut self, range: KeyRange) -> Result<Vec<i64>> {
        (**self).fetch_keys(range)
    }

    fn fetch_columns(&mut self, keys: &[i64], columns: &[String]) -> Result<Table> {
        (**self).fetch_columns(keys, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_range() {
        let range = KeyRange::new(5, 10).unwrap();
        assert!(range.contains(5));
        assert!(range.contains(10));
        assert!(!range.contains(11));
        assert!(!range.contains(4));

        assert!(KeyRange::new(3, 3).is_ok());
        assert!(matches!(KeyRange::new(4, 3), Err(DataError::Config { .. })));
    }
}
