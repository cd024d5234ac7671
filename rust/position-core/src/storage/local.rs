// rust/position-core/src/storage/local.rs

//! Local filesystem storage backend.
//!
//! Small files go through a `BufReader`; files at or above the configured
//! threshold are memory-mapped and copied out in one slice.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::traits::{StorageBackend, StorageReader, StorageWriter};
use crate::config::StorageConfig;
use crate::error::{DataError, Result};

/// Local filesystem storage backend rooted at `base_path`.
pub struct LocalStorage {
    base_path: PathBuf,
    buffer_size: usize,
    use_mmap: bool,
    mmap_threshold: u64,
}

impl LocalStorage {
    /// Creates a new `LocalStorage` instance from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base path cannot be created.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let base_path = config.base_path.clone();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                DataError::storage_with_source(&base_path, "failed to create base directory", e)
            })?;
        }

        Ok(Self {
            base_path,
            buffer_size: config.buffer_size,
            use_mmap: config.use_mmap,
            mmap_threshold: config.mmap_threshold,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolves a path relative to the base path.
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    DataError::storage_with_source(parent, "failed to create parent directories", e)
                })?;
            }
        }
        Ok(())
    }
}

impl StorageBackend for LocalStorage {
    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.resolve_path(path).exists())
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>> {
        let full_path = self.resolve_path(path);
        let file = File::open(&full_path)
            .map_err(|e| DataError::storage_with_source(&full_path, "failed to open file", e))?;

        let size = file
            .metadata()
            .map_err(|e| {
                DataError::storage_with_source(&full_path, "failed to read file metadata", e)
            })?
            .len();

        if self.use_mmap && size >= self.mmap_threshold {
            // SAFETY: shards are immutable once renamed into place and the
            // map is owned by the reader for its whole lifetime.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
                DataError::storage_with_source(&full_path, "failed to memory-map file", e)
            })?;
            Ok(Box::new(MmapReader {
                mmap,
                position: 0,
                path: full_path,
            }))
        } else {
            Ok(Box::new(LocalReader {
                reader: BufReader::with_capacity(self.buffer_size, file),
                size,
                path: full_path,
            }))
        }
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>> {
        let full_path = self.resolve_path(path);
        Self::ensure_parent(&full_path)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full_path)
            .map_err(|e| DataError::storage_with_source(&full_path, "failed to create file", e))?;

        Ok(Box::new(LocalWriter {
            writer: BufWriter::with_capacity(self.buffer_size, file),
            path: full_path,
        }))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve_path(path);
        fs::remove_file(&full_path)
            .map_err(|e| DataError::storage_with_source(&full_path, "failed to delete file", e))
    }

    fn list(&self, dir: &Path) -> Result<Vec<String>> {
        let full_path = self.resolve_path(dir);

        if !full_path.exists() {
            return Ok(Vec::new());
        }
        if !full_path.is_dir() {
            return Err(DataError::storage(&full_path, "path is not a directory"));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&full_path).map_err(|e| {
            DataError::storage_with_source(&full_path, "failed to read directory", e)
        })? {
            let entry = entry.map_err(|e| {
                DataError::storage_with_source(&full_path, "failed to read directory entry", e)
            })?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }

        entries.sort();
        Ok(entries)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.resolve_path(from);
        let to_path = self.resolve_path(to);
        Self::ensure_parent(&to_path)?;

        fs::rename(&from_path, &to_path).map_err(|e| {
            DataError::storage_with_source(
                &from_path,
                format!("failed to rename to {}", to_path.display()),
                e,
            )
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve_path(path);
        fs::create_dir_all(&full_path).map_err(|e| {
            DataError::storage_with_source(&full_path, "failed to create directories", e)
        })
    }
}

struct LocalReader {
    reader: BufReader<File>,
    size: u64,
    path: PathBuf,
}

impl Read for LocalReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageReader for LocalReader {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_remaining(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader
            .read_to_end(&mut buf)
            .map_err(|e| DataError::storage_with_source(&self.path, "failed to read file", e))?;
        Ok(buf)
    }
}

struct MmapReader {
    mmap: Mmap,
    position: usize,
    path: PathBuf,
}

impl Read for MmapReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.mmap[self.position..];
        let to_read = buf.len().min(remaining.len());
        buf[..to_read].copy_from_slice(&remaining[..to_read]);
        self.position += to_read;
        Ok(to_read)
    }
}

impl StorageReader for MmapReader {
    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_remaining(&mut self) -> Result<Vec<u8>> {
        if self.position > self.mmap.len() {
            return Err(DataError::storage(&self.path, "read position past end of map"));
        }
        let rest = self.mmap[self.position..].to_vec();
        self.position = self.mmap.len();
        Ok(rest)
    }
}

struct LocalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageWriter for LocalWriter {
    fn finish(mut self: Box<Self>) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| DataError::storage_with_source(&self.path, "failed to flush writer", e))?;

        self.writer.get_ref().sync_all().map_err(|e| {
            DataError::storage_with_source(&self.path, "failed to sync file to disk", e)
        })?;

        Ok(())
    }
}
