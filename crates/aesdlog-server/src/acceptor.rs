use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use aesdlog_store::LogStore;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::error;

use crate::connection::Connection;

/// Binds `addr` with `SO_REUSEADDR` set and the given listen backlog.
///
/// Built on `socket2` rather than `TcpListener::bind` so the shutdown path
/// (see [`Acceptor::shutdown_handle`]) can later call `shutdown(2)` on a
/// cloned handle to the same underlying socket.
pub fn bind(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let domain = Domain::for_address(addr);
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}

/// Accepts connections on `listener` until `shutdown` is observed, spawning
/// one OS thread per accepted connection and returning their join handles.
///
/// On a transient accept error the loop logs and continues; it only exits
/// when `accept` fails *and* `shutdown` is set, which is exactly what
/// happens once the lifecycle's signal-handling thread shuts the listener
/// down to unblock this call. Each spawned [`Connection`] gets its own clone
/// of `shutdown`, so an idle-but-connected client's handler also notices the
/// same signal instead of staying blocked in `recv` forever.
pub fn run(listener: &TcpListener, store: Arc<dyn LogStore>, shutdown: &Arc<AtomicBool>) -> Vec<JoinHandle<()>> {
    let mut handlers = Vec::new();
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                let store = Arc::clone(&store);
                let shutdown = Arc::clone(shutdown);
                handlers.push(std::thread::spawn(move || Connection::new(stream, peer, store, shutdown).run()));
            }
            Err(e) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                error!(error = %e, "accept failed");
            }
        }
    }
    handlers
}
