// src/supervisor/result.rs

//! Values returned across the supervisor boundary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::JobDefinition;
use crate::errors::JobRunnerError;
use crate::types::{JobStatus, JobType};

/// Outcome of a mutating supervisor call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl JobResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            pid: None,
        }
    }

    pub fn started(pid: Option<u32>) -> Self {
        Self {
            success: true,
            message: "Job started successfully".to_string(),
            pid,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            pid: None,
        }
    }

    /// Prefix the message, keeping success and pid.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.message = format!("{prefix}{}", self.message);
        self
    }
}

impl From<JobRunnerError> for JobResult {
    fn from(err: JobRunnerError) -> Self {
        JobResult::fail(err.to_string())
    }
}

/// Transient supervision state of one job. Absent means STOPPED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeState {
    pub status: JobStatus,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
}

impl RuntimeState {
    pub fn running(pid: Option<u32>, started_at: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Running,
            pid,
            started_at: Some(started_at),
        }
    }

    pub fn error() -> Self {
        Self {
            status: JobStatus::Error,
            pid: None,
            started_at: None,
        }
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            status: JobStatus::Stopped,
            pid: None,
            started_at: None,
        }
    }
}

/// A job definition together with its projected runtime state.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: String,
    pub name: String,
    pub apps: Vec<String>,
    pub main_class: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub enabled: bool,
    pub description: String,
    pub args_required: bool,
    #[serde(flatten)]
    pub state: RuntimeState,
}

impl JobView {
    pub fn new(job: &JobDefinition, state: RuntimeState) -> Self {
        Self {
            id: job.id.clone(),
            name: job.name.clone(),
            apps: job.apps.clone(),
            main_class: job.main_class.clone(),
            job_type: job.job_type,
            enabled: job.enabled,
            description: job.description.clone(),
            args_required: job.args_required,
            state,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.status
    }
}

/// Counts over every configured job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total_jobs: usize,
    pub running: usize,
    pub stopped: usize,
    pub error: usize,
    pub total_apps: usize,
}

impl StatusSummary {
    pub fn from_views(views: &[JobView], total_apps: usize) -> Self {
        let mut summary = StatusSummary {
            total_jobs: views.len(),
            total_apps,
            ..StatusSummary::default()
        };
        for view in views {
            match view.status() {
                JobStatus::Running => summary.running += 1,
                JobStatus::Stopped => summary.stopped += 1,
                JobStatus::Error => summary.error += 1,
            }
        }
        summary
    }
}

/// Result of starting every enabled continuous job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkStartReport {
    pub started: Vec<String>,
    /// `"<id>: <message>"` per job that did not start.
    pub failed: Vec<String>,
}

impl BulkStartReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}
