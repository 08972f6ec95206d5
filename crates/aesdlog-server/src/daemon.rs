//! Process daemonization, ported from the original driver's `run_as_daemon`
//! (fork, `setsid`, `chdir("/")`, redirect stdio to `/dev/null`) onto `nix`.

use std::os::fd::AsRawFd;
use std::path::Path;

use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult};

/// Forks, detaches the child from its controlling terminal, and redirects
/// stdio to `/dev/null`. The parent process exits immediately on success.
///
/// Must be called before any other thread is spawned: `fork` in a
/// multi-threaded process only carries the calling thread into the child,
/// which is why this runs at the very start of `main`.
pub fn daemonize() -> anyhow::Result<()> {
    // SAFETY: called before any other thread exists in this process.
    match unsafe { unistd::fork() }? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    unistd::setsid()?;
    unistd::chdir(Path::new("/"))?;

    let devnull = nix::fcntl::open(
        "/dev/null",
        nix::fcntl::OFlag::O_RDWR,
        Mode::empty(),
    )?;
    for fd in [
        std::io::stdin().as_raw_fd(),
        std::io::stdout().as_raw_fd(),
        std::io::stderr().as_raw_fd(),
    ] {
        unistd::dup2(devnull.as_raw_fd(), fd)?;
    }
    // `devnull` is an `OwnedFd`; it closes its own descriptor on drop once
    // stdin/stdout/stderr each hold their own `dup2`-ed copy.

    Ok(())
}
