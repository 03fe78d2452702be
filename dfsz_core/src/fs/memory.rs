use std::collections::{BTreeMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{FileInfo, FileSystem, ReadStream, WriteStream, DEFAULT_BLOCK_SIZE};

/// Operations that can be made to fail with [`MemoryFs::fail_on`] or
/// [`MemoryFs::fail_on_path`]. `Rename` and `Replace` match on their source path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Exists,
    FileInfo,
    Open,
    Create,
    Delete,
    Rename,
    Replace,
    /// Every `read` on a stream returned by `open`.
    Read,
    /// Every `write` on a stream returned by `create`.
    Write,
}

/// A mutation that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Created(String),
    Deleted(String),
    Renamed { from: String, to: String },
    Replaced { from: String, to: String },
}

#[derive(Debug, Clone)]
struct MemFile {
    data: Vec<u8>,
    replication: u16,
    block_size: u64,
}

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, MemFile>,
    faults: HashSet<FsOp>,
    path_faults: HashSet<(FsOp, String)>,
    /// Path prefixes mounted as separate volumes.
    volumes: Vec<String>,
    journal: Vec<FsEvent>,
    atomic_replace: bool,
}

/// In-memory [`FileSystem`] with fault injection and a mutation journal.
///
/// Clones share the same store, so a test can hand one clone to the code under
/// test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise (or not) an atomic rename-over-existing primitive.
    pub fn with_atomic_replace(self, enabled: bool) -> Self {
        self.lock().atomic_replace = enabled;
        self
    }

    /// Store `data` at `path` without recording a journal event.
    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.lock().files.insert(
            path.to_string(),
            MemFile {
                data: data.into(),
                replication: 3,
                block_size: DEFAULT_BLOCK_SIZE,
            },
        );
    }

    /// Contents of `path`, if it exists.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).map(|f| f.data.clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().files.contains_key(path)
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    /// Make every later `op` fail with an I/O error.
    pub fn fail_on(&self, op: FsOp) {
        self.lock().faults.insert(op);
    }

    /// Make every later `op` on `path` fail, leaving other paths alone.
    pub fn fail_on_path(&self, op: FsOp, path: &str) {
        self.lock().path_faults.insert((op, path.to_string()));
    }

    /// Remove the global fault for `op` and every per-path one.
    pub fn clear_fault(&self, op: FsOp) {
        let mut inner = self.lock();
        inner.faults.remove(&op);
        inner.path_faults.retain(|(faulted, _)| *faulted != op);
    }

    /// Treat everything under `prefix` as a separate volume.
    pub fn mount(&self, prefix: &str) {
        self.lock().volumes.push(prefix.trim_end_matches('/').to_string());
    }

    /// Mutations performed through the [`FileSystem`] interface, in order.
    pub fn mutations(&self) -> Vec<FsEvent> {
        self.lock().journal.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the store from the others.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, op: FsOp, path: &str) -> io::Result<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.faults.contains(&op) || inner.path_faults.contains(&(op, path.to_string())) {
            return Err(injected(op));
        }
        Ok(inner)
    }
}

impl Inner {
    /// Longest mounted prefix containing `path`; "" for the root volume.
    fn volume_of(&self, path: &str) -> &str {
        self.volumes
            .iter()
            .filter(|prefix| {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .max_by_key(|prefix| prefix.len())
            .map_or("", |prefix| prefix.as_str())
    }
}

fn injected(op: FsOp) -> io::Error {
    io::Error::other(format!("injected {op:?} fault"))
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: no such file"))
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &str) -> io::Result<bool> {
        Ok(self.check(FsOp::Exists, path)?.files.contains_key(path))
    }

    fn file_info(&self, path: &str) -> io::Result<FileInfo> {
        let inner = self.check(FsOp::FileInfo, path)?;
        let file = inner.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(FileInfo {
            length: file.data.len() as u64,
            block_size: file.block_size,
            replication: file.replication,
        })
    }

    fn open(&self, path: &str) -> io::Result<ReadStream> {
        let inner = self.check(FsOp::Open, path)?;
        let file = inner.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(Box::new(MemoryReader {
            path: path.to_string(),
            cursor: Cursor::new(file.data.clone()),
            fs: self.clone(),
        }))
    }

    fn create(
        &self,
        path: &str,
        overwrite: bool,
        replication: u16,
        block_size: u64,
    ) -> io::Result<WriteStream> {
        let mut inner = self.check(FsOp::Create, path)?;
        if !overwrite && inner.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{path} already exists"),
            ));
        }
        inner.files.insert(
            path.to_string(),
            MemFile {
                data: Vec::new(),
                replication,
                block_size,
            },
        );
        inner.journal.push(FsEvent::Created(path.to_string()));
        Ok(Box::new(MemoryWriter {
            path: path.to_string(),
            fs: self.clone(),
        }))
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        let mut inner = self.check(FsOp::Delete, path)?;
        inner.files.remove(path).ok_or_else(|| not_found(path))?;
        inner.journal.push(FsEvent::Deleted(path.to_string()));
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let mut inner = self.check(FsOp::Rename, from)?;
        if inner.files.contains_key(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("rename target {to} already exists"),
            ));
        }
        let file = inner.files.remove(from).ok_or_else(|| not_found(from))?;
        inner.files.insert(to.to_string(), file);
        inner.journal.push(FsEvent::Renamed {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }

    fn same_volume(&self, a: &str, b: &str) -> io::Result<bool> {
        let inner = self.lock();
        for path in [a, b] {
            if !inner.files.contains_key(path) {
                return Err(not_found(path));
            }
        }
        Ok(inner.volume_of(a) == inner.volume_of(b))
    }

    fn supports_atomic_replace(&self) -> bool {
        self.lock().atomic_replace
    }

    fn replace(&self, from: &str, to: &str) -> io::Result<()> {
        let mut inner = self.check(FsOp::Replace, from)?;
        if !inner.atomic_replace {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "atomic replace is disabled on this store",
            ));
        }
        let file = inner.files.remove(from).ok_or_else(|| not_found(from))?;
        inner.files.insert(to.to_string(), file);
        inner.journal.push(FsEvent::Replaced {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }
}

struct MemoryReader {
    path: String,
    cursor: Cursor<Vec<u8>>,
    fs: MemoryFs,
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fs.check(FsOp::Read, &self.path)?;
        self.cursor.read(buf)
    }
}

/// Appends straight into the stored file, so its length is visible to
/// `file_info` while the stream is still open.
struct MemoryWriter {
    path: String,
    fs: MemoryFs,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.fs.check(FsOp::Write, &self.path)?;
        let file = inner.files.get_mut(&self.path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} was removed while open", self.path),
            )
        })?;
        file.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let fs = MemoryFs::new();
        let mut out = fs.create("/f", true, 2, 64).unwrap();
        out.write_all(b"abc").unwrap();
        out.write_all(b"def").unwrap();
        drop(out);

        let info = fs.file_info("/f").unwrap();
        assert_eq!(info.length, 6);
        assert_eq!(info.replication, 2);
        assert_eq!(info.block_size, 64);

        let mut back = Vec::new();
        fs.open("/f").unwrap().read_to_end(&mut back).unwrap();
        assert_eq!(back, b"abcdef");
        assert_eq!(fs.mutations(), vec![FsEvent::Created("/f".into())]);
    }

    #[test]
    fn injected_faults_fire_until_cleared() {
        let fs = MemoryFs::new();
        fs.insert("/f", b"data".to_vec());
        fs.fail_on(FsOp::Delete);
        assert!(fs.delete("/f").is_err());
        assert!(fs.contains("/f"));
        fs.clear_fault(FsOp::Delete);
        fs.delete("/f").unwrap();
        assert!(!fs.contains("/f"));
    }

    #[test]
    fn path_faults_hit_only_their_path() {
        let fs = MemoryFs::new();
        fs.insert("/a", b"a".to_vec());
        fs.insert("/b", b"b".to_vec());
        fs.fail_on_path(FsOp::Delete, "/a");
        assert!(fs.delete("/a").is_err());
        fs.delete("/b").unwrap();

        fs.clear_fault(FsOp::Delete);
        fs.delete("/a").unwrap();
        assert!(fs.paths().is_empty());
    }

    #[test]
    fn mounted_prefixes_are_separate_volumes() {
        let fs = MemoryFs::new();
        fs.mount("/tmp");
        for path in ["/data/a", "/data/b", "/tmp/x", "/tmpfile"] {
            fs.insert(path, Vec::new());
        }
        assert!(fs.same_volume("/data/a", "/data/b").unwrap());
        assert!(!fs.same_volume("/data/a", "/tmp/x").unwrap());
        assert!(fs.same_volume("/data/a", "/tmpfile").unwrap());
        assert_eq!(fs.same_volume("/data/a", "/nope").unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn read_fault_hits_open_streams() {
        let fs = MemoryFs::new();
        fs.insert("/f", vec![1u8; 32]);
        let mut stream = fs.open("/f").unwrap();
        fs.fail_on(FsOp::Read);
        let mut buf = [0u8; 8];
        assert!(stream.read(&mut buf).is_err());
    }

    #[test]
    fn rename_refuses_existing_target() {
        let fs = MemoryFs::new();
        fs.insert("/a", b"a".to_vec());
        fs.insert("/b", b"b".to_vec());
        let err = fs.rename("/a", "/b").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(fs.mutations().is_empty());
    }

    #[test]
    fn replace_requires_opt_in() {
        let fs = MemoryFs::new();
        fs.insert("/a", b"new".to_vec());
        fs.insert("/b", b"old".to_vec());
        assert!(!fs.supports_atomic_replace());
        assert_eq!(fs.replace("/a", "/b").unwrap_err().kind(), io::ErrorKind::Unsupported);

        let fs = fs.with_atomic_replace(true);
        fs.replace("/a", "/b").unwrap();
        assert_eq!(fs.read("/b").unwrap(), b"new");
        assert_eq!(fs.paths(), vec!["/b".to_string()]);
    }

    #[test]
    fn writes_fail_after_delete() {
        let fs = MemoryFs::new();
        let mut out = fs.create("/f", true, 1, 1).unwrap();
        fs.delete("/f").unwrap();
        assert_eq!(out.write(b"x").unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }
}
