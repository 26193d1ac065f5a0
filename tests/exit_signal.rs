// tests/exit_signal.rs
//
// Sends a real SIGTERM to the test process, so it lives alone in its own
// test binary.
#![cfg(unix)]

mod common;
use crate::common::{Harness, JobBuilder, mains, with_timeout};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use jobrunner::types::JobStatus;

#[tokio::test]
async fn sigterm_runs_the_hook_and_leaves_exiting_to_the_subscriber() {
    let h = Harness::new(vec![JobBuilder::new("sleeper", mains::SLEEP).build()]);
    let mut fired = h.supervisor.exit_hook().subscribe();
    assert!(h.supervisor.install_exit_hook());

    let started = h.supervisor.start("sleeper", &[]).await;
    assert!(started.success, "{}", started.message);

    kill(Pid::this(), Signal::SIGTERM).unwrap();
    with_timeout(fired.wait_for(|f| *f)).await.unwrap();

    // Still here: the subscriber owns the decision to exit.
    assert!(h.supervisor.exit_hook().has_fired());
    assert_eq!(h.supervisor.status("sleeper").await, JobStatus::Stopped);

    #[cfg(target_os = "linux")]
    {
        let pid = started.pid.unwrap();
        let gone = common::eventually(|| async move { !common::process_alive(pid) }).await;
        assert!(gone, "pid {pid} survived SIGTERM to the host");
    }
}
