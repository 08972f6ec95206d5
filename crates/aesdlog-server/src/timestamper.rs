use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use aesdlog_store::LogStore;
use chrono::Local;
use tracing::warn;

const WAKE_GRANULARITY: Duration = Duration::from_secs(1);

/// Appends a `timestamp:%a, %d %b %Y %H:%M:%S %z\n` line to `store` every
/// `interval`, via the same `append_bytes` discipline connection handlers
/// use. Polls `shutdown` on a short granularity so it wakes promptly rather
/// than sleeping through the whole interval after a shutdown request.
pub fn spawn(store: Arc<dyn LogStore>, interval: Duration, shutdown: Arc<AtomicBool>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut since_last = Duration::ZERO;
        while !shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(WAKE_GRANULARITY);
            since_last += WAKE_GRANULARITY;
            if since_last < interval {
                continue;
            }
            since_last = Duration::ZERO;

            let line = Local::now().format("timestamp:%a, %d %b %Y %H:%M:%S %z\n").to_string();
            if let Err(e) = store.append_bytes(line.as_bytes()) {
                warn!(error = %e, "failed to append timestamp");
            }
        }
    })
}
