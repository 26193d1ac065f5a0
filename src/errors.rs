// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Supervisor operations never let these escape: they are turned into a
//! [`crate::supervisor::JobResult`] at the boundary. Inside the crate they
//! flow with `?` like any other error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobRunnerError {
    /// Unknown job or app id. The payload is the full human readable message.
    #[error("{0}")]
    NotFound(String),

    /// Start on a disabled/running job, or an operation after shutdown.
    #[error("{0}")]
    InvalidState(String),

    #[error("Error starting job: {0}")]
    SpawnFailure(String),

    #[error("Process {pid} for job '{job}' survived a forced kill")]
    TerminationFailure { job: String, pid: u32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobRunnerError {
    pub fn job_not_found(id: &str) -> Self {
        JobRunnerError::NotFound(format!("Job not found: {id}"))
    }

    pub fn app_not_found(id: &str) -> Self {
        JobRunnerError::NotFound(format!("App not found: {id}"))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobRunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_result_wording() {
        assert_eq!(
            JobRunnerError::job_not_found("nightly").to_string(),
            "Job not found: nightly"
        );
        assert_eq!(
            JobRunnerError::SpawnFailure("No such file or directory".into()).to_string(),
            "Error starting job: No such file or directory"
        );
        assert_eq!(
            JobRunnerError::InvalidState("Job is already running: a".into()).to_string(),
            "Job is already running: a"
        );
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn fails() -> Result<()> {
            Err(std::io::Error::other("disk full"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, JobRunnerError::IoError(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
