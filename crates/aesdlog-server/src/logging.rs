use tracing_subscriber::EnvFilter;

/// Installs a process-wide `tracing` subscriber, replacing the original
/// driver's `openlog("aesdsocket", LOG_PID, LOG_USER)` call.
///
/// Defaults to `info` level; override with `RUST_LOG`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .ok();
}
