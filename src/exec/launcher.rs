// src/exec/launcher.rs

//! Pluggable process launcher.
//!
//! The supervisor talks to a `ProcessLauncher` instead of building
//! `tokio::process::Command`s itself. Production code uses
//! [`TokioLauncher`]; tests can wrap it to count spawns or inject failures.

use std::fmt::Debug;
use std::io;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

use super::command::LaunchCommand;

/// Trait abstracting how a [`LaunchCommand`] becomes a running child.
///
/// Implementations must pipe both stdout and stderr; the supervisor takes
/// them for log capture.
pub trait ProcessLauncher: Send + Sync + Debug {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Child>;
}

/// Real launcher used in production.
#[derive(Debug, Clone, Default)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Child> {
        debug!(cmd = %command, cwd = %command.working_dir.display(), "spawning process");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn()
    }
}
