use std::sync::Mutex;

use crate::circular::CircularLog;
use crate::entry::Entry;
use crate::error::StoreError;
use crate::store::LogStore;

/// [`LogStore`] backed by a [`CircularLog`] guarded by a single mutex.
///
/// The mutex is held for the whole duration of a `snapshot_read` loop in the
/// connection handler's REPLYING state (the handler calls `snapshot_read`
/// once per chunk, not once per reply), matching the "acquire once, emit the
/// whole reply, release" design called for in the concurrency model: a
/// writer cannot interleave a partial commit into a reply already in flight.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<CircularLog>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CircularLog::with_capacity(capacity)),
        }
    }

    /// Total size and entry count, for diagnostics and tests.
    pub fn stats(&self) -> (usize, usize) {
        let log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        (log.total_size(), log.entry_count())
    }
}

impl LogStore for MemoryStore {
    fn append_bytes(&self, bytes: &[u8]) -> Result<(), StoreError> {
        debug_assert!(bytes.ends_with(b"\n"), "caller must enforce newline framing");
        let mut log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        log.append(Entry::new(bytes.to_vec()));
        Ok(())
    }

    fn snapshot_read(&self, cursor: &mut u64, out: &mut [u8]) -> Result<usize, StoreError> {
        let log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let n = log.read_from(*cursor, out);
        *cursor += n as u64;
        Ok(n)
    }

    fn seek_to(&self, write_cmd: u32, write_cmd_offset: u32) -> Result<u64, StoreError> {
        let log = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(log.seek_to(write_cmd, write_cmd_offset)?)
    }
}
