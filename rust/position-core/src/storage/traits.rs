// rust/position-core/src/storage/traits.rs

//! Storage abstraction traits used by the shard store.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::Result;

/// A handle for reading a stored object front to back.
pub trait StorageReader: Read + Send {
    /// Returns the total size of the object in bytes.
    fn size(&self) -> u64;

    /// Reads everything from the current position to the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn read_remaining(&mut self) -> Result<Vec<u8>>;
}

/// A handle for writing to storage.
pub trait StorageWriter: Write + Send {
    /// Flushes and syncs the written data.
    ///
    /// This method must be called to complete the write. After calling
    /// `finish`, the writer should not be used again.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// File-level operations needed to write and read shard sets.
///
/// Object-safe, so the shard store can hold a `Box<dyn StorageBackend>`.
pub trait StorageBackend: Send + Sync {
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Opens an object for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or cannot be opened.
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>>;

    /// Opens an object for writing, truncating any existing content.
    /// Parent directories are created if they don't exist.
    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>>;

    fn delete(&self, path: &Path) -> Result<()>;

    /// Lists the entry names of a directory, sorted. A missing directory
    /// lists as empty.
    fn list(&self, dir: &Path) -> Result<Vec<String>>;

    /// Renames an object, replacing the destination if present.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;
}
