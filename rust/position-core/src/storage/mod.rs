// rust/position-core/src/storage/mod.rs

//! Storage abstraction for shard files.
//!
//! The shard store only talks to a `StorageBackend`, so tests and callers can
//! swap the filesystem layer without touching the shard format.
//!
//! # Example
//!
//! ```no_run
//! use position_core::config::StorageConfig;
//! use position_core::storage::{LocalStorage, StorageBackend};
//! use std::io::Write;
//! use std::path::Path;
//!
//! let config = StorageConfig::default();
//! let storage = LocalStorage::new(&config).unwrap();
//!
//! let mut writer = storage.open_write(Path::new("example.bin")).unwrap();
//! writer.write_all(b"Hello, world!").unwrap();
//! writer.finish().unwrap();
//!
//! let mut reader = storage.open_read(Path::new("example.bin")).unwrap();
//! let content = reader.read_remaining().unwrap();
//! assert_eq!(content, b"Hello, world!");
//! ```

mod local;
mod traits;

pub use local::LocalStorage;
pub use traits::{StorageBackend, StorageReader, StorageWriter};
