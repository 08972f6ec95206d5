//! Line-oriented TCP append-log server, built on [`aesdlog_store`].
//!
//! Split into a library so integration tests can drive the acceptor and
//! connection handler directly, the same way `main` does.

pub mod acceptor;
pub mod config;
pub mod connection;
#[cfg(unix)]
pub mod daemon;
pub mod lifecycle;
pub mod logging;
pub mod timestamper;
