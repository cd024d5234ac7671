// rust/position-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {

    #[error("Invalid position '{fen}': {message}")]
    InvalidPosition {
        fen: String,
        message: String,
    },

    #[error("Invalid evaluation '{value}': {message}")]
    InvalidEvaluation {
        value: String,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Backing store error: {message}")]
    BackingStore {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Index consistency error: {message}")]
    IndexConsistency {
        message: String,
    },

    #[error("Degenerate input: {message}")]
    DegenerateInput {
        message: String,
    },

    #[error("Column '{name}' not found")]
    ColumnNotFound {
        name: String,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, DataError>;

// Convenience constructors
impl DataError {

    pub fn invalid_position(fen: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPosition {
            fen: fen.into(),
            message: message.into(),
        }
    }

    pub fn invalid_evaluation(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEvaluation {
            value: value.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn backing_store(message: impl Into<String>) -> Self {
        Self::BackingStore {
            message: message.into(),
            source: None,
        }
    }

    pub fn backing_store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::BackingStore {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn index_consistency(message: impl Into<String>) -> Self {
        Self::IndexConsistency {
            message: message.into(),
        }
    }

    pub fn degenerate_input(message: impl Into<String>) -> Self {
        Self::DegenerateInput {
            message: message.into(),
        }
    }

    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// True for failures of the underlying data source: file I/O on the shard
    /// directory or a relational store error.
    pub fn is_backing_store(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::BackingStore { .. })
    }
}

impl From<rusqlite::Error> for DataError {
    fn from(err: rusqlite::Error) -> Self {
        Self::backing_store_with_source("sqlite query failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_store_classification() {
        assert!(DataError::storage("/tmp/x", "gone").is_backing_store());
        assert!(DataError::backing_store("connection reset").is_backing_store());
        assert!(!DataError::config("batch_size must be greater than 0").is_backing_store());
        assert!(!DataError::index_consistency("duplicate key 4").is_backing_store());
    }

    #[test]
    fn test_display_messages() {
        let err = DataError::invalid_position("8/8/8/8/8/8/8/8 w - -", "white has no king");
        assert_eq!(
            err.to_string(),
            "Invalid position '8/8/8/8/8/8/8/8 w - -': white has no king"
        );

        let err = DataError::column_not_found("w_pawn_a1");
        assert_eq!(err.to_string(), "Column 'w_pawn_a1' not found");
    }
}
