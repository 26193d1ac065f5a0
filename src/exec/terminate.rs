// src/exec/terminate.rs

//! Graceful-then-forced termination of a child process.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How a termination attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited within the grace period after the polite signal.
    Graceful(Option<ExitStatus>),
    /// Needed a forced kill.
    Forced(Option<ExitStatus>),
    /// Still not confirmed dead after the forced kill wait.
    Survived,
}

/// Ask `child` to exit, wait up to `grace`, then force-kill and wait up to
/// `kill_wait`.
///
/// The exit status is `None` when waiting itself failed; the process is
/// treated as gone in that case.
pub async fn terminate(child: &mut Child, grace: Duration, kill_wait: Duration) -> Termination {
    if let Err(e) = request_exit(child) {
        warn!(error = %e, "failed to deliver graceful termination signal");
    }

    match timeout(grace, child.wait()).await {
        Ok(status) => return Termination::Graceful(log_wait_error(status)),
        Err(_) => debug!(?grace, "process still alive after grace period; forcing"),
    }

    if let Err(e) = child.start_kill() {
        // `InvalidInput` means it was reaped between the timeout and here.
        if e.kind() != io::ErrorKind::InvalidInput {
            warn!(error = %e, "failed to force-kill process");
        }
    }

    match timeout(kill_wait, child.wait()).await {
        Ok(status) => Termination::Forced(log_wait_error(status)),
        Err(_) => Termination::Survived,
    }
}

/// Force-kill without waiting. Already-exited children are not an error.
pub fn force_kill(child: &mut Child) -> io::Result<()> {
    match child.start_kill() {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e),
    }
}

fn log_wait_error(status: io::Result<ExitStatus>) -> Option<ExitStatus> {
    match status {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(error = %e, "failed waiting for process exit");
            None
        }
    }
}

#[cfg(unix)]
fn request_exit(child: &mut Child) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // `None` once the child has been reaped: nothing left to signal.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(io::Error::other)?;

    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) -> io::Result<()> {
    force_kill(child)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    fn spawn_sh(script: &str) -> Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("sh should spawn")
    }

    #[tokio::test]
    async fn polite_signal_is_enough_for_a_cooperative_process() {
        let mut child = spawn_sh("exec sleep 30");
        let outcome = terminate(&mut child, Duration::from_secs(5), Duration::from_secs(2)).await;
        assert!(matches!(outcome, Termination::Graceful(Some(_))), "{outcome:?}");
    }

    #[tokio::test]
    async fn ignoring_sigterm_escalates_to_a_forced_kill() {
        let mut child = spawn_sh("trap '' TERM; while :; do sleep 1; done");
        // Give the shell time to install the trap.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let outcome =
            terminate(&mut child, Duration::from_millis(300), Duration::from_secs(2)).await;
        assert!(matches!(outcome, Termination::Forced(Some(_))), "{outcome:?}");
    }

    #[tokio::test]
    async fn terminating_an_exited_process_is_a_no_op() {
        let mut child = spawn_sh("exit 0");
        child.wait().await.unwrap();

        let outcome = terminate(&mut child, Duration::from_secs(1), Duration::from_secs(1)).await;
        assert!(matches!(outcome, Termination::Graceful(Some(status)) if status.success()));
        assert!(force_kill(&mut child).is_ok());
    }
}
