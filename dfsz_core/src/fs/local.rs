use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use super::{FileInfo, FileSystem, ReadStream, WriteStream, DEFAULT_BLOCK_SIZE};

/// [`FileSystem`] over a local directory.
///
/// Logical paths such as `/logs/app.log` are resolved beneath `root`.
/// Replication is always reported as 1. `rename` refuses to overwrite, like a
/// distributed filesystem client; `replace` uses `std::fs::rename`, which
/// swaps the target atomically on the same volume. Written files are synced
/// to disk when their stream is flushed.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a logical path to a location under `root`, rejecting `..`.
    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path {path:?} escapes the filesystem root"),
                    ))
                }
            }
        }
        Ok(resolved)
    }
}

impl FileSystem for LocalFs {
    fn exists(&self, path: &str) -> io::Result<bool> {
        self.resolve(path)?.try_exists()
    }

    fn file_info(&self, path: &str) -> io::Result<FileInfo> {
        let meta = fs::metadata(self.resolve(path)?)?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{path} is not a regular file"),
            ));
        }
        Ok(FileInfo {
            length: meta.len(),
            block_size: DEFAULT_BLOCK_SIZE,
            replication: 1,
        })
    }

    fn open(&self, path: &str) -> io::Result<ReadStream> {
        Ok(Box::new(File::open(self.resolve(path)?)?))
    }

    fn create(
        &self,
        path: &str,
        overwrite: bool,
        _replication: u16,
        _block_size: u64,
    ) -> io::Result<WriteStream> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        Ok(Box::new(SyncOnFlush(BufWriter::new(options.open(target)?))))
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path)?)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let target = self.resolve(to)?;
        if target.try_exists()? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("rename target {to} already exists"),
            ));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(self.resolve(from)?, target)
    }

    #[cfg(unix)]
    fn same_volume(&self, a: &str, b: &str) -> io::Result<bool> {
        use std::os::unix::fs::MetadataExt;

        let a = fs::metadata(self.resolve(a)?)?;
        let b = fs::metadata(self.resolve(b)?)?;
        Ok(a.dev() == b.dev())
    }

    fn supports_atomic_replace(&self) -> bool {
        true
    }

    fn replace(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.resolve(from)?, self.resolve(to)?)
    }
}

/// `flush` drains the buffer and then `fsync`s the file, so the data is
/// durable before the caller goes on to delete or rename anything.
struct SyncOnFlush(BufWriter<File>);

impl Write for SyncOnFlush {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()?;
        self.0.get_ref().sync_all()
    }
}
