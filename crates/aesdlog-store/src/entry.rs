/// One complete, newline-terminated command as retained by a [`crate::CircularLog`].
///
/// Mirrors the `struct aesd_buffer_entry { buffptr, size }` pair from the
/// original character-driver circular buffer: the byte count is cached
/// alongside the bytes rather than recomputed on every offset walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    bytes: Box<[u8]>,
}

impl Entry {
    /// Builds an entry from a complete command, including its trailing `\n`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is empty. The server never constructs a zero-length
    /// entry; callers enforce that a command has at least the terminating
    /// newline before committing it.
    pub fn new(bytes: Vec<u8>) -> Self {
        assert!(!bytes.is_empty(), "a command entry must not be empty");
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
