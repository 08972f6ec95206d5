use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;

const DEFAULT_PORT: u16 = 9000;
const DEFAULT_BACKLOG: i32 = 10;
const DEFAULT_CAPACITY: usize = aesdlog_store::DEFAULT_CAPACITY;
const DEFAULT_FILE_PATH: &str = "/var/tmp/aesdsocketdata";
const DEFAULT_TIMESTAMP_INTERVAL: Duration = Duration::from_secs(10);

/// Which [`aesdlog_store::LogStore`] implementation backs the server.
///
/// Replaces the original driver's compile-time `USE_AESD_CHAR_DEVICE` switch
/// with a runtime choice, so a single binary supports both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Backend {
    /// In-memory [`aesdlog_store::CircularLog`], retaining `capacity` commands.
    Memory,
    /// Append-only file at `file_path`.
    File,
}

/// Whether the timestamper thread runs at all.
///
/// `Auto` reproduces the original driver's conditional compilation: the
/// structured character-device backend (here, [`Backend::Memory`]) never ran
/// the timer thread, while the file-backed build always did. `Always`/`Never`
/// let an operator override that default explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Timestamps {
    Auto,
    Always,
    Never,
}

impl Timestamps {
    fn resolve(self, backend: Backend) -> bool {
        match self {
            Timestamps::Auto => matches!(backend, Backend::File),
            Timestamps::Always => true,
            Timestamps::Never => false,
        }
    }
}

/// Command-line flags. `-d` is the original driver's sole flag; the rest
/// turn former compile-time constants into runtime configuration.
#[derive(Debug, Parser)]
#[command(name = "aesdlog-server", about = "Line-oriented TCP append-log server")]
pub struct Cli {
    /// Detach from the controlling terminal and run as a daemon.
    #[arg(short = 'd', long = "daemon")]
    pub daemon: bool,

    /// TCP port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Listen backlog passed to `listen(2)`.
    #[arg(long)]
    pub backlog: Option<i32>,

    /// Number of commands retained by the in-memory backend.
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Which backend to use.
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Backing file path for the file backend.
    #[arg(long)]
    pub file_path: Option<PathBuf>,

    /// How often the timestamper appends a `timestamp:` line.
    #[arg(long)]
    pub timestamp_interval: Option<humantime::Duration>,

    /// Whether the timestamper thread runs at all (default: only for the
    /// file backend, matching the original driver's behavior).
    #[arg(long, value_enum)]
    pub timestamps: Option<Timestamps>,

    /// Optional TOML config file; CLI flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Mirrors [`Cli`]'s configurable fields, deserialized from an optional TOML
/// file. Any field left unset falls through to the compiled-in default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    backlog: Option<i32>,
    capacity: Option<usize>,
    backend: Option<Backend>,
    file_path: Option<PathBuf>,
    timestamp_interval_secs: Option<u64>,
    timestamps: Option<Timestamps>,
    daemon: Option<bool>,
}

/// The fully-resolved configuration for one server run, built by layering
/// compiled-in defaults, an optional config file, and CLI flags (later
/// layers win).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub backlog: i32,
    pub capacity: usize,
    pub backend: Backend,
    pub file_path: PathBuf,
    pub daemonize: bool,
    pub timestamp_interval: Duration,
    pub timestamper_enabled: bool,
}

impl ServerConfig {
    pub fn resolve(cli: Cli) -> anyhow::Result<Self> {
        let file_cfg = match &cli.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => FileConfig::default(),
        };

        let port = cli.port.or(file_cfg.port).unwrap_or(DEFAULT_PORT);
        let backlog = cli.backlog.or(file_cfg.backlog).unwrap_or(DEFAULT_BACKLOG);
        let capacity = cli.capacity.or(file_cfg.capacity).unwrap_or(DEFAULT_CAPACITY);
        let backend = cli.backend.or(file_cfg.backend).unwrap_or(Backend::Memory);
        let file_path = cli
            .file_path
            .or(file_cfg.file_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_PATH));
        let timestamp_interval = cli
            .timestamp_interval
            .map(Into::into)
            .or(file_cfg.timestamp_interval_secs.map(Duration::from_secs))
            .unwrap_or(DEFAULT_TIMESTAMP_INTERVAL);
        let daemonize = cli.daemon || file_cfg.daemon.unwrap_or(false);
        let timestamps = cli.timestamps.or(file_cfg.timestamps).unwrap_or(Timestamps::Auto);

        anyhow::ensure!(capacity > 0, "capacity must be at least 1");

        Ok(Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            backlog,
            capacity,
            backend,
            file_path,
            daemonize,
            timestamp_interval,
            timestamper_enabled: timestamps.resolve(backend),
        })
    }
}
