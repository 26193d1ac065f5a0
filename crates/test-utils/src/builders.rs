#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use jobrunner::config::{GlobalSettings, JobDefinition, JobsConfig, RawAppConfig, RawJobsConfig};
use jobrunner::types::JobType;

/// Builder for `JobsConfig` to simplify test setup.
pub struct JobsConfigBuilder {
    config: RawJobsConfig,
}

impl JobsConfigBuilder {
    /// Empty config whose logs go to `logs_dir` and whose config dir is empty.
    pub fn new(logs_dir: impl AsRef<Path>) -> Self {
        Self {
            config: RawJobsConfig {
                global: GlobalSettings {
                    java_home: PathBuf::from("/opt/test-jdk"),
                    java_cmd: None,
                    java_opts: String::new(),
                    config_dir: PathBuf::new(),
                    logs_dir: logs_dir.as_ref().to_path_buf(),
                },
                apps: BTreeMap::new(),
                jobs: Vec::new(),
            },
        }
    }

    /// Run every job through the fake JVM script (see `fake_jvm`).
    pub fn with_fake_jvm(mut self, script: impl AsRef<Path>) -> Self {
        self.config.global.java_cmd = Some(PathBuf::from("/bin/sh"));
        self.config.global.java_opts = script.as_ref().display().to_string();
        self
    }

    pub fn with_java_cmd(mut self, cmd: impl AsRef<Path>) -> Self {
        self.config.global.java_cmd = Some(cmd.as_ref().to_path_buf());
        self
    }

    pub fn with_config_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.global.config_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_app(mut self, id: &str, webapp_path: impl AsRef<Path>) -> Self {
        self.config.apps.insert(
            id.to_string(),
            RawAppConfig {
                name: None,
                webapp_path: webapp_path.as_ref().to_path_buf(),
            },
        );
        self
    }

    pub fn with_job(mut self, job: JobDefinition) -> Self {
        self.config.jobs.push(job);
        self
    }

    pub fn build(self) -> JobsConfig {
        JobsConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `JobDefinition`.
pub struct JobBuilder {
    job: JobDefinition,
}

impl JobBuilder {
    pub fn new(id: &str, main_class: &str) -> Self {
        Self {
            job: JobDefinition::new(id, main_class),
        }
    }

    pub fn app(mut self, id: &str) -> Self {
        self.job.apps.push(id.to_string());
        self
    }

    pub fn param(mut self, value: &str) -> Self {
        self.job.params.push(value.to_string());
        self
    }

    pub fn continuous(mut self) -> Self {
        self.job.job_type = JobType::Continuous;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.job.enabled = false;
        self
    }

    pub fn java_opts(mut self, opts: &str) -> Self {
        self.job.java_opts = Some(opts.to_string());
        self
    }

    pub fn build(self) -> JobDefinition {
        self.job
    }
}
