use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aesdlog_store::LogStore;
use tracing::{info, warn};

const RECV_BUF_SIZE: usize = 1024;
const SNAPSHOT_BUF_SIZE: usize = 4096;
const SEEKTO_PREFIX: &str = "AESDCHAR_IOCSEEKTO:";

/// How often a blocked `recv` wakes up to recheck the shutdown flag.
///
/// The listener itself is unblocked by `shutdown(2)` from the lifecycle's
/// signal thread, but a per-connection socket has no such handle reaching
/// it; a short read timeout is what lets an idle, still-connected client's
/// handler notice the shutdown flag instead of blocking in `recv` forever.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Per-connection state machine: reassembles newline-delimited commands from
/// `stream`, commits each to `store`, and streams the current snapshot back
/// after every commit (or after a positioning control command).
///
/// One instance runs on its own OS thread for the lifetime of the TCP
/// connection; `partial` is this thread's only private, non-shared state.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    store: Arc<dyn LogStore>,
    shutdown: Arc<AtomicBool>,
    /// Bytes received since the last newline. Invariant: never contains `\n`.
    partial: Vec<u8>,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, store: Arc<dyn LogStore>, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            stream,
            peer,
            store,
            shutdown,
            partial: Vec::new(),
        }
    }

    /// Runs the READING/REPLYING loop until the peer disconnects, a recv
    /// fails, or the shutdown flag is observed. Any unterminated tail left in
    /// `partial` at that point is discarded, matching the framing contract.
    pub fn run(mut self) {
        info!(peer = %self.peer, "accepted connection");

        if let Err(e) = self.stream.set_read_timeout(Some(SHUTDOWN_POLL_INTERVAL)) {
            warn!(peer = %self.peer, error = %e, "failed to set read timeout; shutdown may block on this connection");
        }

        let mut recv_buf = [0u8; RECV_BUF_SIZE];
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let n = match self.stream.read(&mut recv_buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "recv failed, closing connection");
                    break;
                }
            };

            if let Err(e) = self.consume(&recv_buf[..n]) {
                warn!(peer = %self.peer, error = %e, "send failed, closing connection");
                break;
            }
        }

        info!(peer = %self.peer, "closed connection");
    }

    /// Splits `chunk` on `\n`, committing (or seeking on) each complete
    /// segment and replying after each, then retains any trailing partial
    /// bytes for the next call.
    fn consume(&mut self, chunk: &[u8]) -> io::Result<()> {
        let mut start = 0;
        for (i, &b) in chunk.iter().enumerate() {
            if b != b'\n' {
                continue;
            }
            let segment_tail = &chunk[start..=i];
            start = i + 1;

            if self.partial.is_empty() {
                if let Some((write_cmd, write_cmd_offset)) = parse_seekto(segment_tail) {
                    self.reply_from_seek(write_cmd, write_cmd_offset)?;
                    continue;
                }
                self.commit_and_reply(segment_tail)?;
            } else {
                self.partial.extend_from_slice(segment_tail);
                if let Some((write_cmd, write_cmd_offset)) = parse_seekto(&self.partial) {
                    self.partial.clear();
                    self.reply_from_seek(write_cmd, write_cmd_offset)?;
                } else {
                    let command = std::mem::take(&mut self.partial);
                    self.commit_and_reply(&command)?;
                }
            }
        }
        self.partial.extend_from_slice(&chunk[start..]);
        Ok(())
    }

    fn commit_and_reply(&mut self, command: &[u8]) -> io::Result<()> {
        if let Err(e) = self.store.append_bytes(command) {
            warn!(peer = %self.peer, error = %e, "failed to append command");
        }
        self.reply_from(0)
    }

    /// On a seek failure the control command is still consumed (never
    /// logged); the reply simply falls back to streaming from offset 0, per
    /// the "best-effort, never crash the handler" error policy.
    fn reply_from_seek(&mut self, write_cmd: u32, write_cmd_offset: u32) -> io::Result<()> {
        let offset = match self.store.seek_to(write_cmd, write_cmd_offset) {
            Ok(offset) => offset,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "seek failed, replying from offset 0");
                0
            }
        };
        self.reply_from(offset)
    }

    fn reply_from(&mut self, mut cursor: u64) -> io::Result<()> {
        let mut buf = [0u8; SNAPSHOT_BUF_SIZE];
        loop {
            let n = self
                .store
                .snapshot_read(&mut cursor, &mut buf)
                .map_err(io::Error::other)?;
            if n == 0 {
                break;
            }
            self.stream.write_all(&buf[..n])?;
        }
        Ok(())
    }
}

/// Parses a complete, newline-terminated segment against the
/// `AESDCHAR_IOCSEEKTO:<u32>,<u32>\n` grammar. Recognition only happens on a
/// whole segment: there is no partial matching across recv boundaries.
fn parse_seekto(segment: &[u8]) -> Option<(u32, u32)> {
    let text = std::str::from_utf8(segment).ok()?;
    let text = text.strip_suffix('\n')?;
    let rest = text.strip_prefix(SEEKTO_PREFIX)?;
    let (a, b) = rest.split_once(',')?;
    let write_cmd: u32 = a.parse().ok()?;
    let write_cmd_offset: u32 = b.parse().ok()?;
    Some((write_cmd, write_cmd_offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_well_formed_seekto() {
        assert_eq!(parse_seekto(b"AESDCHAR_IOCSEEKTO:2,1\n"), Some((2, 1)));
    }

    #[test]
    fn rejects_malformed_seekto() {
        assert_eq!(parse_seekto(b"AESDCHAR_IOCSEEKTO:2,1extra\n"), None);
        assert_eq!(parse_seekto(b"AESDCHAR_IOCSEEKTO:2\n"), None);
        assert_eq!(parse_seekto(b"AESDCHAR_IOCSEEKTO:a,b\n"), None);
        assert_eq!(parse_seekto(b"not a control command\n"), None);
        assert_eq!(parse_seekto(b"AESDCHAR_IOCSEEKTO:2, 1\n"), None); // no spaces allowed
    }

    #[test]
    fn requires_the_trailing_newline() {
        assert_eq!(parse_seekto(b"AESDCHAR_IOCSEEKTO:2,1"), None);
    }
}
