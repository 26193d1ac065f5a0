#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jobrunner::clock::Clock;
use jobrunner::config::{ConfigStore, JobDefinition, TomlConfigStore};
use jobrunner::fs::{FileSystem, RealFileSystem};
use jobrunner::supervisor::{ProcessSupervisor, SupervisorOptions};
use jobrunner::types::JobStatus;
use tempfile::TempDir;

pub use jobrunner_test_utils::builders::{JobBuilder, JobsConfigBuilder};
pub use jobrunner_test_utils::fake_jvm::mains;
pub use jobrunner_test_utils::launchers::{FailingLauncher, RecordingLauncher};
pub use jobrunner_test_utils::{FixedClock, eventually, init_tracing, with_timeout};

/// Short timings so termination paths finish quickly.
pub fn fast_options() -> SupervisorOptions {
    SupervisorOptions {
        grace_period: Duration::from_millis(500),
        kill_wait: Duration::from_secs(2),
        drain_timeout: Duration::from_secs(2),
        restart_delay: Duration::from_millis(50),
        ..SupervisorOptions::default()
    }
}

/// A supervisor running jobs through the fake JVM inside a scratch directory.
pub struct Harness {
    pub dir: TempDir,
    pub logs_dir: PathBuf,
    pub launcher: Arc<RecordingLauncher>,
    pub supervisor: Arc<ProcessSupervisor>,
}

impl Harness {
    pub fn new(jobs: Vec<JobDefinition>) -> Self {
        Self::with_options(fast_options(), jobs)
    }

    pub fn with_options(options: SupervisorOptions, jobs: Vec<JobDefinition>) -> Self {
        Self::build(options, None, |builder, _| with_jobs(builder, jobs))
    }

    /// Timestamps in logs and runtime state come from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>, jobs: Vec<JobDefinition>) -> Self {
        Self::build(fast_options(), Some(clock), |builder, _| with_jobs(builder, jobs))
    }

    /// Full control over the config; `configure` also receives the scratch dir.
    pub fn with_config(
        configure: impl FnOnce(JobsConfigBuilder, &Path) -> JobsConfigBuilder,
    ) -> Self {
        Self::build(fast_options(), None, configure)
    }

    fn build(
        options: SupervisorOptions,
        clock: Option<Arc<dyn Clock>>,
        configure: impl FnOnce(JobsConfigBuilder, &Path) -> JobsConfigBuilder,
    ) -> Self {
        init_tracing();

        let dir = tempfile::tempdir().expect("tempdir");
        let script = jobrunner_test_utils::fake_jvm::install_fake_jvm(dir.path());
        // Not created up front: start must create it.
        let logs_dir = dir.path().join("logs");

        let builder = JobsConfigBuilder::new(&logs_dir).with_fake_jvm(&script);
        let config = configure(builder, dir.path()).build();

        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store: Arc<dyn ConfigStore> = Arc::new(TomlConfigStore::in_memory(fs.clone(), config));
        let launcher = Arc::new(RecordingLauncher::new());
        let mut supervisor = ProcessSupervisor::new(store, fs)
            .with_launcher(launcher.clone())
            .with_options(options);
        if let Some(clock) = clock {
            supervisor = supervisor.with_clock(clock);
        }

        Self {
            dir,
            logs_dir,
            launcher,
            supervisor: Arc::new(supervisor),
        }
    }

    pub fn log_file(&self, job_id: &str) -> PathBuf {
        self.logs_dir.join(format!("{job_id}.log"))
    }

    /// Wait until `status(job_id)` reports something other than RUNNING.
    pub async fn wait_for_exit(&self, job_id: &str) -> JobStatus {
        let sup = self.supervisor.clone();
        with_timeout(async move {
            loop {
                let status = sup.status(job_id).await;
                if status != JobStatus::Running {
                    return status;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
    }

    /// Wait until the in-memory log contains `needle`.
    pub async fn wait_for_log(&self, job_id: &str, needle: &str) -> bool {
        let sup = self.supervisor.clone();
        eventually(|| {
            let found = sup.logs(job_id, None).contains(needle);
            async move { found }
        })
        .await
    }
}

fn with_jobs(builder: JobsConfigBuilder, jobs: Vec<JobDefinition>) -> JobsConfigBuilder {
    jobs.into_iter().fold(builder, JobsConfigBuilder::with_job)
}

/// Whether a process with `pid` still exists (zombies count as gone).
#[cfg(target_os = "linux")]
pub fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !stat
            .rsplit_once(')')
            .map(|(_, rest)| rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}
