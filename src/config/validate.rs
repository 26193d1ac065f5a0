use std::collections::{BTreeMap, HashSet};

use crate::config::model::{AppDefinition, JobsConfig, RawJobsConfig};
use crate::errors::{JobRunnerError, Result};

impl TryFrom<RawJobsConfig> for JobsConfig {
    type Error = JobRunnerError;

    fn try_from(raw: RawJobsConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let apps: BTreeMap<String, AppDefinition> = raw
            .apps
            .into_iter()
            .map(|(id, app)| {
                let name = app.name.unwrap_or_else(|| id.clone());
                let def = AppDefinition {
                    id: id.clone(),
                    name,
                    webapp_path: app.webapp_path,
                };
                (id, def)
            })
            .collect();

        Ok(JobsConfig::new_unchecked(raw.global, apps, raw.jobs))
    }
}

/// Re-check an already constructed config, e.g. after a mutation.
pub fn validate_config(cfg: &JobsConfig) -> Result<()> {
    validate_raw_config(&cfg.to_raw())
}

fn validate_raw_config(cfg: &RawJobsConfig) -> Result<()> {
    validate_job_fields(cfg)?;
    validate_unique_ids(cfg)?;
    validate_app_references(cfg)?;
    Ok(())
}

fn validate_job_fields(cfg: &RawJobsConfig) -> Result<()> {
    for (index, job) in cfg.jobs.iter().enumerate() {
        if job.id.trim().is_empty() {
            return Err(JobRunnerError::ConfigError(format!(
                "job #{} has an empty `id`",
                index + 1
            )));
        }
        if job.main_class.trim().is_empty() {
            return Err(JobRunnerError::ConfigError(format!(
                "job '{}' has an empty `main_class`",
                job.id
            )));
        }
    }
    Ok(())
}

fn validate_unique_ids(cfg: &RawJobsConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for job in cfg.jobs.iter() {
        if !seen.insert(job.id.as_str()) {
            return Err(JobRunnerError::ConfigError(format!(
                "job id '{}' is declared more than once",
                job.id
            )));
        }
    }
    Ok(())
}

fn validate_app_references(cfg: &RawJobsConfig) -> Result<()> {
    for job in cfg.jobs.iter() {
        for app in job.apps.iter() {
            if !cfg.apps.contains_key(app) {
                return Err(JobRunnerError::ConfigError(format!(
                    "job '{}' references unknown app '{}'",
                    job.id, app
                )));
            }
        }
    }
    Ok(())
}
