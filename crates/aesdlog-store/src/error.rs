use std::io;

use thiserror::Error;

/// Error returned by [`crate::CircularLog::seek_to`].
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum SeekError {
    #[error("write_cmd {write_cmd} is out of range ({entry_count} entries retained)")]
    InvalidCommand { write_cmd: u32, entry_count: u32 },
    #[error("write_cmd_offset {write_cmd_offset} is out of range for entry of size {entry_size}")]
    InvalidOffset { write_cmd_offset: u32, entry_size: u32 },
}

/// Error returned by a [`crate::LogStore`] implementation.
///
/// The in-memory backend never returns [`StoreError::Io`]; the file backend
/// never returns [`StoreError::Seek`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seek failed")]
    Seek(#[from] SeekError),
    #[error("backend I/O failure")]
    Io(#[from] io::Error),
    #[error("seek_to is not supported by this backend")]
    Unsupported,
}
