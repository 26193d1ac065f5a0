use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use jobrunner::exec::{LaunchCommand, ProcessLauncher, TokioLauncher};
use tokio::process::Child;

/// Launches for real, remembering every command it was given.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    inner: TokioLauncher,
    launched: Mutex<Vec<LaunchCommand>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn commands(&self) -> Vec<LaunchCommand> {
        self.launched.lock().unwrap().clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Child> {
        self.launched.lock().unwrap().push(command.clone());
        self.inner.launch(command)
    }
}

/// Never spawns anything; every launch fails like a missing executable.
#[derive(Debug, Default)]
pub struct FailingLauncher {
    attempts: AtomicUsize,
}

impl FailingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ProcessLauncher for FailingLauncher {
    fn launch(&self, _command: &LaunchCommand) -> io::Result<Child> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "No such file or directory (os error 2)",
        ))
    }
}
