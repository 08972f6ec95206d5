//! Orchestrates one server run: binds the listener, spawns the timestamper,
//! runs the accept loop, and tears both down on SIGINT/SIGTERM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aesdlog_store::LogStore;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use socket2::Socket;
use tracing::info;

use crate::acceptor;
use crate::config::ServerConfig;
use crate::timestamper;

/// Binds, serves, and blocks until a shutdown signal arrives, then joins
/// every connection thread and the timestamper before returning.
///
/// Unblocking the listener's `accept()` call is the crux of a clean shutdown:
/// a signal handler cannot safely touch the listener itself, so a dedicated
/// thread watches for SIGINT/SIGTERM and instead calls `shutdown(2)` on a
/// `socket2` handle to the same underlying socket, which wakes `accept()`
/// with an error that the acceptor recognizes as a shutdown request. The
/// same `shutdown` flag is handed to every connection handler, which polls
/// it on its own recv timeout; without that, an idle-but-connected client
/// would leave its handler blocked in `recv` forever and the join loop below
/// would never return.
pub fn run(config: ServerConfig, store: Arc<dyn LogStore>) -> anyhow::Result<()> {
    let listener = acceptor::bind(config.bind_addr, config.backlog)?;
    info!(addr = %config.bind_addr, "listening");

    let shutdown = Arc::new(AtomicBool::new(false));
    let unblock_socket = Socket::from(listener.try_clone()?);

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signal_shutdown = Arc::clone(&shutdown);
    let signal_thread = std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(signal, "received shutdown signal");
            signal_shutdown.store(true, Ordering::SeqCst);
            let _ = unblock_socket.shutdown(std::net::Shutdown::Both);
        }
    });

    let timestamper_handle = config
        .timestamper_enabled
        .then(|| timestamper::spawn(Arc::clone(&store), config.timestamp_interval, Arc::clone(&shutdown)));

    let connection_handles = acceptor::run(&listener, Arc::clone(&store), &shutdown);
    for handle in connection_handles {
        let _ = handle.join();
    }

    shutdown.store(true, Ordering::SeqCst);
    if let Some(handle) = timestamper_handle {
        let _ = handle.join();
    }
    let _ = signal_thread.join();

    info!("shutdown complete");
    Ok(())
}
