use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared job type.
///
/// - `Continuous`: a long-running service, selected by bulk start.
/// - `OnDemand`: a one-shot invocation (default).
///
/// Parsing is lenient: any unrecognised string falls back to `OnDemand`, so a
/// typo in `jobs.toml` never prevents the config from loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    Continuous,
    #[default]
    OnDemand,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Continuous => "continuous",
            JobType::OnDemand => "on-demand",
        }
    }
}

impl From<String> for JobType {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl From<JobType> for String {
    fn from(t: JobType) -> Self {
        t.as_str().to_string()
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continuous" => Ok(JobType::Continuous),
            "on-demand" | "on_demand" | "ondemand" => Ok(JobType::OnDemand),
            other => Err(format!(
                "invalid job type: {other} (expected \"continuous\" or \"on-demand\")"
            )),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervision status of a job as shown to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Stopped,
    Running,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Stopped => "stopped",
            JobStatus::Running => "running",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_parses_known_spellings() {
        assert_eq!("continuous".parse::<JobType>(), Ok(JobType::Continuous));
        assert_eq!(" On-Demand ".parse::<JobType>(), Ok(JobType::OnDemand));
        assert!("hourly".parse::<JobType>().is_err());
    }

    #[test]
    fn unknown_job_type_falls_back_to_on_demand() {
        assert_eq!(JobType::from("hourly".to_string()), JobType::OnDemand);
    }

    #[test]
    fn status_display_is_lowercase() {
        assert_eq!(JobStatus::Running.to_string(), "running");
        assert_eq!(JobStatus::default(), JobStatus::Stopped);
    }
}
