// rust/position-core/src/position/schema.rs

//! Feature column naming.
//!
//! A `FeatureSchema` binds the 772 encoder outputs to column names, in
//! encoder order. The canonical schema is generated from the board
//! enumeration; a custom one can be loaded from TOML as long as it keeps the
//! same column count and layout version.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::board::{Color, PieceKind, Square, LAYOUT_VERSION};
use super::encoder::FEATURE_COUNT;
use crate::error::{DataError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSchema {
    /// Layout version the names were written against.
    pub version: u32,
    /// One name per feature, in encoder order.
    pub columns: Vec<String>,
}

impl FeatureSchema {
    /// Names every feature after the board enumeration: `w_pawn_a1` …
    /// `w_king_h8`, `w_castling`, `w_castling_queenside`, then the same for
    /// `b_`.
    pub fn canonical() -> Self {
        let mut columns = Vec::with_capacity(FEATURE_COUNT);
        for color in Color::ALL {
            let prefix = color.prefix();
            for kind in PieceKind::ALL {
                for square in Square::all() {
                    columns.push(format!("{prefix}_{}_{square}", kind.name()));
                }
            }
            columns.push(format!("{prefix}_castling"));
            columns.push(format!("{prefix}_castling_queenside"));
        }
        Self {
            version: LAYOUT_VERSION,
            columns,
        }
    }

    /// Builds and validates a schema from explicit names.
    pub fn new(version: u32, columns: Vec<String>) -> Result<Self> {
        let schema = Self { version, columns };
        schema.validate()?;
        Ok(schema)
    }

    /// Loads a schema from a TOML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the file cannot be read and `Config` if it does
    /// not parse or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::storage_with_source(path, "failed to read feature schema", e)
        })?;
        content.parse()
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != LAYOUT_VERSION {
            return Err(DataError::config(format!(
                "feature schema version {} does not match encoder layout version {LAYOUT_VERSION}",
                self.version
            )));
        }
        if self.columns.len() != FEATURE_COUNT {
            return Err(DataError::config(format!(
                "feature schema has {} columns, expected {FEATURE_COUNT}",
                self.columns.len()
            )));
        }

        let mut seen = HashSet::with_capacity(self.columns.len());
        for name in &self.columns {
            if !is_identifier(name) {
                return Err(DataError::config(format!(
                    "feature column '{name}' is not a valid identifier"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(DataError::config(format!(
                    "feature column '{name}' appears more than once"
                )));
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks that `names` are exactly the schema columns, in order.
    pub fn check_layout<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        if names.len() != self.columns.len() {
            return Err(DataError::config(format!(
                "expected {} feature columns, found {}",
                self.columns.len(),
                names.len()
            )));
        }
        for (i, (expected, actual)) in self.columns.iter().zip(names).enumerate() {
            if expected != actual.as_ref() {
                return Err(DataError::config(format!(
                    "feature column {i} is '{}', expected '{expected}'",
                    actual.as_ref()
                )));
            }
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::canonical()
    }
}

impl FromStr for FeatureSchema {
    type Err = DataError;

    /// Parses a schema from TOML and validates it.
    fn from_str(s: &str) -> Result<Self> {
        let schema: FeatureSchema = toml::from_str(s)
            .map_err(|e| DataError::config_with_source("failed to parse feature schema", e))?;
        schema.validate()?;
        Ok(schema)
    }
}

/// ASCII letter or underscore, then letters, digits or underscores. Names are
/// interpolated into SQL as quoted identifiers, so the character set is kept
/// narrow.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_canonical_names() {
        let schema = FeatureSchema::canonical();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.len(), FEATURE_COUNT);
        assert_eq!(schema.columns()[0], "w_pawn_a1");
        assert_eq!(schema.columns()[63], "w_pawn_h8");
        assert_eq!(schema.columns()[64], "w_knight_a1");
        assert_eq!(schema.columns()[383], "w_king_h8");
        assert_eq!(schema.columns()[384], "w_castling");
        assert_eq!(schema.columns()[385], "w_castling_queenside");
        assert_eq!(schema.columns()[386], "b_pawn_a1");
        assert_eq!(schema.columns()[771], "b_castling_queenside");
    }

    #[test]
    fn test_validate_rejects_wrong_version() {
        let mut schema = FeatureSchema::canonical();
        schema.version = LAYOUT_VERSION + 1;
        assert!(matches!(schema.validate(), Err(DataError::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_wrong_count() {
        let mut schema = FeatureSchema::canonical();
        schema.columns.pop();
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_names() {
        let mut schema = FeatureSchema::canonical();
        schema.columns[1] = schema.columns[0].clone();
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let mut schema = FeatureSchema::canonical();
        schema.columns[5] = "bad name".to_string();
        assert!(schema.validate().is_err());

        let mut schema = FeatureSchema::canonical();
        schema.columns[5] = "1st".to_string();
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_from_str_roundtrip() {
        let canonical = FeatureSchema::canonical();
        let text = toml::to_string(&canonical).unwrap();
        let parsed: FeatureSchema = text.parse().unwrap();
        assert_eq!(parsed, canonical);
    }

    #[test]
    fn test_from_str_rejects_unknown_fields() {
        let mut text = toml::to_string(&FeatureSchema::canonical()).unwrap();
        text.insert_str(0, "extra = true\n");
        let result: Result<FeatureSchema> = text.parse();
        assert!(matches!(result, Err(DataError::Config { .. })));
    }

    #[test]
    fn test_from_file() {
        let renamed: Vec<String> = (0..FEATURE_COUNT).map(|i| format!("f{i}")).collect();
        let schema = FeatureSchema::new(LAYOUT_VERSION, renamed).unwrap();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", toml::to_string(&schema).unwrap()).unwrap();

        let loaded = FeatureSchema::from_file(file.path()).unwrap();
        assert_eq!(loaded.columns()[771], "f771");
    }

    #[test]
    fn test_from_file_not_found() {
        let result = FeatureSchema::from_file("/nonexistent/schema.toml");
        assert!(matches!(result, Err(DataError::Storage { .. })));
    }

    #[test]
    fn test_check_layout() {
        let schema = FeatureSchema::canonical();
        assert!(schema.check_layout(schema.columns()).is_ok());

        let mut swapped = schema.columns().to_vec();
        swapped.swap(0, 1);
        assert!(schema.check_layout(&swapped).is_err());
        assert!(schema.check_layout(&swapped[..10]).is_err());
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("w_pawn_a1"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("a\"b"));
    }
}
