use crate::error::StoreError;

/// The shared log abstraction consumed by connection handlers and the
/// timestamper.
///
/// Implementations serialize `append_bytes` and `snapshot_read` against each
/// other (see the crate-level docs for the ordering guarantee), but never
/// block one reader on another once each has acquired its turn.
pub trait LogStore: Send + Sync {
    /// Commits `bytes` to the log atomically: the whole slice is appended, or
    /// none of it is.
    fn append_bytes(&self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Copies bytes starting at `*cursor` into `out`, advancing `*cursor` by
    /// the number of bytes copied. Returns `0` at end-of-log.
    fn snapshot_read(&self, cursor: &mut u64, out: &mut [u8]) -> Result<usize, StoreError>;

    /// Resolves a positioning request to an absolute byte offset and leaves
    /// the store ready to be read from that offset.
    ///
    /// Backends that do not support structured seeking (the file backend)
    /// return [`StoreError::Unsupported`].
    fn seek_to(&self, write_cmd: u32, write_cmd_offset: u32) -> Result<u64, StoreError>;
}
