use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::store::LogStore;

/// [`LogStore`] backed by a growing append-only file.
///
/// Has no structured notion of "commands": `seek_to` always returns
/// [`StoreError::Unsupported`], and the handler falls back to streaming from
/// offset 0, per the backend-abstraction design note. The backing file is
/// removed both when the store is created (discarding any stale file from a
/// previous run) and when it is dropped.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileStore {
    /// Opens `path` for append/read, removing any pre-existing file first.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let file = OpenOptions::new().create(true).read(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogStore for FileStore {
    fn append_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    fn snapshot_read(&self, cursor: &mut u64, out: &mut [u8]) -> Result<usize, StoreError> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start(*cursor))?;
        let n = file.read(out)?;
        *cursor += n as u64;
        Ok(n)
    }

    fn seek_to(&self, _write_cmd: u32, _write_cmd_offset: u32) -> Result<u64, StoreError> {
        Err(StoreError::Unsupported)
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove backing file on shutdown");
        }
    }
}
