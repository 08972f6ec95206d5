use crate::entry::Entry;
use crate::error::SeekError;

/// Default ring capacity, matching `AESDCHAR_MAX_WRITE_OPERATIONS_SUPPORTED`
/// in the original character driver.
pub const DEFAULT_CAPACITY: usize = 10;

/// A fixed-capacity ring of command [`Entry`] values.
///
/// Appending past capacity silently evicts the oldest retained entry. Unlike
/// the original driver's `struct aesd_circular_buffer`, the capacity is a
/// runtime parameter rather than a compile-time array size, so the server can
/// expose it as a configuration knob; `DEFAULT_CAPACITY` reproduces the
/// original K=10.
#[derive(Debug)]
pub struct CircularLog {
    slots: Vec<Option<Entry>>,
    in_idx: usize,
    out_idx: usize,
    full: bool,
}

impl CircularLog {
    /// Creates an empty log with the default capacity (10).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty log able to retain up to `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "a circular log must retain at least one entry");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            in_idx: 0,
            out_idx: 0,
            full: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Appends `entry`, evicting the oldest retained entry if the ring is full.
    pub fn append(&mut self, entry: Entry) {
        let cap = self.slots.len();
        self.slots[self.in_idx] = Some(entry);
        self.in_idx = (self.in_idx + 1) % cap;
        if self.full {
            self.out_idx = (self.out_idx + 1) % cap;
        }
        self.full = self.in_idx == self.out_idx;
    }

    /// Number of entries currently retained (`0..=capacity`).
    pub fn entry_count(&self) -> usize {
        let cap = self.slots.len();
        if self.full {
            cap
        } else {
            (self.in_idx + cap - self.out_idx) % cap
        }
    }

    /// Sum of the byte sizes of all retained entries.
    pub fn total_size(&self) -> usize {
        self.iter().map(|e| e.size()).sum()
    }

    /// Retained entries in oldest-to-newest order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        let cap = self.slots.len();
        let count = self.entry_count();
        (0..count).map(move |i| {
            self.slots[(self.out_idx + i) % cap]
                .as_ref()
                .expect("occupied range must hold entries")
        })
    }

    /// Resolves an absolute byte offset into the concatenation of retained
    /// entries to the entry covering it and the offset within that entry.
    ///
    /// Returns `None` if `offset` is at or past the total size (one-past-end),
    /// or if the log is empty.
    pub fn find_by_byte_offset(&self, offset: u64) -> Option<(&Entry, u64)> {
        let mut cumulative: u64 = 0;
        for entry in self.iter() {
            let size = entry.size() as u64;
            if cumulative + size > offset {
                return Some((entry, offset - cumulative));
            }
            cumulative += size;
        }
        None
    }

    /// Absolute byte offset at which the `k`-th retained entry (0 = oldest)
    /// begins. `None` if `k` is out of range.
    pub fn absolute_offset_of_cmd(&self, k: usize) -> Option<u64> {
        if k >= self.entry_count() {
            return None;
        }
        Some(self.iter().take(k).map(|e| e.size() as u64).sum())
    }

    /// Resolves a `(write_cmd, write_cmd_offset)` positioning request to an
    /// absolute byte offset, per the `AESDCHAR_IOCSEEKTO` contract.
    pub fn seek_to(&self, write_cmd: u32, in_cmd_offset: u32) -> Result<u64, SeekError> {
        let entry_count = self.entry_count();
        if write_cmd as usize >= entry_count || write_cmd as usize >= self.slots.len() {
            return Err(SeekError::InvalidCommand {
                write_cmd,
                entry_count: entry_count as u32,
            });
        }
        let entry = self
            .iter()
            .nth(write_cmd as usize)
            .expect("write_cmd already bounds-checked against entry_count");
        if in_cmd_offset as usize >= entry.size() {
            return Err(SeekError::InvalidOffset {
                write_cmd_offset: in_cmd_offset,
                entry_size: entry.size() as u32,
            });
        }
        let base = self
            .absolute_offset_of_cmd(write_cmd as usize)
            .expect("write_cmd already bounds-checked against entry_count");
        Ok(base + in_cmd_offset as u64)
    }

    /// Copies bytes starting at `offset` into `out`, returning the number of
    /// bytes copied (0 at or past end-of-log). May read across entry
    /// boundaries but never past the last retained byte.
    pub fn read_from(&self, offset: u64, out: &mut [u8]) -> usize {
        if out.is_empty() || offset >= self.total_size() as u64 {
            return 0;
        }
        let mut written = 0usize;
        let mut cumulative = 0u64;
        for entry in self.iter() {
            let size = entry.size() as u64;
            if cumulative + size <= offset {
                cumulative += size;
                continue;
            }
            let bytes = entry.as_bytes();
            let start = offset.saturating_sub(cumulative) as usize;
            let src = &bytes[start..];
            let n = src.len().min(out.len() - written);
            out[written..written + n].copy_from_slice(&src[..n]);
            written += n;
            cumulative += size;
            if written == out.len() {
                break;
            }
        }
        written
    }
}

impl Default for CircularLog {
    fn default() -> Self {
        Self::new()
    }
}
