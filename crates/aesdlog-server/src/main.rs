//! Entry point: parse flags, resolve configuration, optionally daemonize,
//! build the configured backend, and run the server until a shutdown
//! signal arrives.

use std::sync::Arc;

use aesdlog_server::config::{Backend, Cli, ServerConfig};
use aesdlog_server::{lifecycle, logging};
use aesdlog_store::{FileStore, LogStore, MemoryStore};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::resolve(cli)?;

    logging::init();

    if config.daemonize {
        #[cfg(unix)]
        aesdlog_server::daemon::daemonize()?;
        #[cfg(not(unix))]
        anyhow::bail!("daemonizing is only supported on unix targets");
    }

    let store: Arc<dyn LogStore> = match config.backend {
        Backend::Memory => Arc::new(MemoryStore::new(config.capacity)),
        Backend::File => Arc::new(FileStore::create(&config.file_path)?),
    };

    lifecycle::run(config, store)
}
