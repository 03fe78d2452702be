//! The filesystem collaborator.
//!
//! [`FileSystem`] is the narrow slice of a distributed filesystem client the
//! replacement needs. [`LocalFs`] maps it onto a local directory and
//! [`MemoryFs`] keeps everything in memory with switchable faults for tests.

use std::io::{self, Read, Write};

mod local;
mod memory;

pub use local::LocalFs;
pub use memory::{FsEvent, FsOp, MemoryFs};

pub type ReadStream = Box<dyn Read + Send>;
pub type WriteStream = Box<dyn Write + Send>;

/// Block size reported for files on stores that have no block concept.
pub const DEFAULT_BLOCK_SIZE: u64 = 128 * 1024 * 1024;

/// Metadata for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub length: u64,
    pub block_size: u64,
    pub replication: u16,
}

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &str) -> io::Result<bool>;

    fn file_info(&self, path: &str) -> io::Result<FileInfo>;

    fn open(&self, path: &str) -> io::Result<ReadStream>;

    fn create(
        &self,
        path: &str,
        overwrite: bool,
        replication: u16,
        block_size: u64,
    ) -> io::Result<WriteStream>;

    fn delete(&self, path: &str) -> io::Result<()>;

    /// Move `from` to `to`. Fails if `to` already exists.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Whether `a` and `b` (both existing) live on the same volume, so a
    /// rename between them cannot fail for crossing devices.
    fn same_volume(&self, _a: &str, _b: &str) -> io::Result<bool> {
        Ok(true)
    }

    /// Whether [`replace`](Self::replace) is available.
    fn supports_atomic_replace(&self) -> bool {
        false
    }

    /// Atomically move `from` over an existing `to`.
    fn replace(&self, from: &str, to: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("atomic replace of {to} by {from} is not supported"),
        ))
    }
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn exists(&self, path: &str) -> io::Result<bool> {
        (**self).exists(path)
    }

    fn file_info(&self, path: &str) -> io::Result<FileInfo> {
        (**self).file_info(path)
    }

    fn open(&self, path: &str) -> io::Result<ReadStream> {
        (**self).open(path)
    }

    fn create(
        &self,
        path: &str,
        overwrite: bool,
        replication: u16,
        block_size: u64,
    ) -> io::Result<WriteStream> {
        (**self).create(path, overwrite, replication, block_size)
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        (**self).delete(path)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn same_volume(&self, a: &str, b: &str) -> io::Result<bool> {
        (**self).same_volume(a, b)
    }

    fn supports_atomic_replace(&self) -> bool {
        (**self).supports_atomic_replace()
    }

    fn replace(&self, from: &str, to: &str) -> io::Result<()> {
        (**self).replace(from, to)
    }
}
