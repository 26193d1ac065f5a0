// src/supervisor/registry.rs

//! Shared supervision state: live processes, runtime states and the capture
//! task pool, all behind one lock.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::process::Child;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::capture::CaptureHandle;
use crate::types::JobStatus;

use super::result::RuntimeState;

/// A registered, possibly still running, child process.
#[derive(Debug)]
pub(crate) struct ManagedProcess {
    pub child: Child,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub capture: CaptureHandle,
}

/// What a liveness check found for one job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Observed {
    NotRegistered,
    Alive,
    /// The process had exited and has now been deregistered.
    Exited(JobStatus),
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    /// At most one entry per job id.
    pub processes: HashMap<String, ManagedProcess>,
    /// Absent means STOPPED.
    pub states: HashMap<String, RuntimeState>,
    pub captures: JoinSet<()>,
    /// Set by shutdown; no further starts are accepted.
    pub closed: bool,
}

impl Registry {
    pub fn state(&self, job_id: &str) -> RuntimeState {
        self.states.get(job_id).cloned().unwrap_or_default()
    }

    /// Drop both the process entry and the runtime state of `job_id`.
    pub fn forget(&mut self, job_id: &str) -> Option<ManagedProcess> {
        self.states.remove(job_id);
        self.processes.remove(job_id)
    }

    /// Check whether the registered process of `job_id` is still alive.
    ///
    /// An exited process is deregistered and classified: exit code 0 is
    /// STOPPED (state removed), anything else is ERROR (recorded). Its capture
    /// task is left to drain whatever output is still buffered in the pipe.
    pub fn observe(&mut self, job_id: &str) -> Observed {
        let Some(process) = self.processes.get_mut(job_id) else {
            return Observed::NotRegistered;
        };

        let status = match process.child.try_wait() {
            Ok(None) => return Observed::Alive,
            Ok(Some(exit)) if exit.success() => {
                info!(job = %job_id, pid = ?process.pid, "job exited");
                JobStatus::Stopped
            }
            Ok(Some(exit)) => {
                warn!(job = %job_id, pid = ?process.pid, status = %exit, "job exited with failure");
                JobStatus::Error
            }
            Err(e) => {
                warn!(job = %job_id, pid = ?process.pid, error = %e, "cannot poll job process; treating as stopped");
                JobStatus::Stopped
            }
        };

        self.processes.remove(job_id);
        match status {
            JobStatus::Error => {
                self.states.insert(job_id.to_string(), RuntimeState::error());
            }
            _ => {
                self.states.remove(job_id);
            }
        }
        Observed::Exited(status)
    }

    /// Collect capture tasks that have already finished.
    pub fn reap_captures(&mut self) {
        while let Some(res) = self.captures.try_join_next() {
            match res {
                Err(e) if e.is_panic() => warn!(error = %e, "log capture task panicked"),
                _ => {}
            }
        }
    }
}
