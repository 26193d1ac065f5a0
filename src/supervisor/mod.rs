// src/supervisor/mod.rs

//! The process supervisor.
//!
//! `ProcessSupervisor` owns the job id → child process registry and the
//! runtime state of every job. All registry mutations go through one
//! `tokio::sync::Mutex`, held across the whole of `start` and `stop`, so the
//! "is it running?" check and the insertion of a new process are one step.
//!
//! Operations never return errors: failures are reported as a
//! [`JobResult`] with `success = false`, and status queries degrade to
//! STOPPED.

pub mod options;
mod registry;
pub mod result;
pub mod shutdown;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::capture::{
    LogSink, LogStore, OutputStream, log_file_path, spawn_capture, tail_lines,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigStore, JobDefinition};
use crate::errors::{JobRunnerError, Result};
use crate::exec::{ProcessLauncher, Termination, TokioLauncher, build_command, resolve_apps, terminate};
use crate::fs::FileSystem;
use crate::types::{JobStatus, JobType};

pub use options::SupervisorOptions;
pub use result::{BulkStartReport, JobResult, JobView, RuntimeState, StatusSummary};
pub use shutdown::ShutdownCoordinator;

use registry::{ManagedProcess, Observed, Registry};

#[derive(Debug)]
pub struct ProcessSupervisor {
    store: Arc<dyn ConfigStore>,
    fs: Arc<dyn FileSystem>,
    launcher: Arc<dyn ProcessLauncher>,
    clock: Arc<dyn Clock>,
    options: SupervisorOptions,
    registry: Arc<Mutex<Registry>>,
    logs: LogStore,
    exit_hook: ShutdownCoordinator,
}

impl ProcessSupervisor {
    /// Supervisor with the real launcher, the system clock and default
    /// options. Use the `with_*` methods to replace them before sharing it.
    pub fn new(store: Arc<dyn ConfigStore>, fs: Arc<dyn FileSystem>) -> Self {
        let options = SupervisorOptions::default();
        let registry = Arc::new(Mutex::new(Registry::default()));
        Self {
            store,
            fs,
            launcher: Arc::new(TokioLauncher),
            clock: Arc::new(SystemClock),
            options,
            logs: LogStore::new(options.log_cap, options.log_trim_unit),
            exit_hook: ShutdownCoordinator::new(Arc::clone(&registry)),
            registry,
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: SupervisorOptions) -> Self {
        self.options = options;
        self.logs = LogStore::new(options.log_cap, options.log_trim_unit);
        self
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    pub fn exit_hook(&self) -> &ShutdownCoordinator {
        &self.exit_hook
    }

    /// Install the host-exit hook. Returns `false` if it was already installed.
    pub fn install_exit_hook(&self) -> bool {
        self.exit_hook.install()
    }

    /// Start `job_id` with optional extra arguments appended after its params.
    pub async fn start(&self, job_id: &str, runtime_args: &[String]) -> JobResult {
        match self.try_start(job_id, runtime_args).await {
            Ok(pid) => JobResult::started(pid),
            Err(e) => {
                debug!(job = %job_id, error = %e, "start refused");
                e.into()
            }
        }
    }

    async fn try_start(&self, job_id: &str, runtime_args: &[String]) -> Result<Option<u32>> {
        let mut registry = self.registry.lock().await;
        registry.reap_captures();

        let job = self
            .store
            .job(job_id)
            .ok_or_else(|| JobRunnerError::job_not_found(job_id))?;
        if !job.enabled {
            return Err(JobRunnerError::InvalidState(format!("Job is disabled: {job_id}")));
        }
        if registry.processes.contains_key(job_id) {
            return Err(JobRunnerError::InvalidState(format!(
                "Job is already running: {job_id}"
            )));
        }
        if registry.closed {
            return Err(JobRunnerError::InvalidState("Supervisor is shut down".to_string()));
        }

        match self.spawn(&job, runtime_args, &mut registry) {
            Ok(pid) => Ok(pid),
            Err(e) => {
                error!(job = %job_id, error = %e, "failed to start job");
                registry.states.insert(job_id.to_string(), RuntimeState::error());
                Err(e)
            }
        }
    }

    /// Build, spawn and register. Caller holds the registry lock.
    fn spawn(
        &self,
        job: &JobDefinition,
        runtime_args: &[String],
        registry: &mut Registry,
    ) -> Result<Option<u32>> {
        let apps = resolve_apps(job, self.store.as_ref())?;
        let global = self.store.global();
        let command = build_command(job, &apps, &global, runtime_args, self.fs.as_ref());

        self.fs.create_dir_all(&global.logs_dir).map_err(|e| {
            JobRunnerError::SpawnFailure(format!(
                "cannot create log directory {}: {e:#}",
                global.logs_dir.display()
            ))
        })?;

        let mut child = self
            .launcher
            .launch(&command)
            .map_err(|e| JobRunnerError::SpawnFailure(e.to_string()))?;
        let pid = child.id();
        let started_at = self.clock.now();

        let mut streams: Vec<OutputStream> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            streams.push(Box::new(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            streams.push(Box::new(stderr));
        }

        let sink = LogSink {
            job_id: job.id.clone(),
            buffer: self.logs.reset(&job.id),
            file_path: log_file_path(&global.logs_dir, &job.id),
            clock: Arc::clone(&self.clock),
        };
        let capture = spawn_capture(&mut registry.captures, sink, streams);

        registry.processes.insert(
            job.id.clone(),
            ManagedProcess {
                child,
                pid,
                started_at,
                capture,
            },
        );
        registry
            .states
            .insert(job.id.clone(), RuntimeState::running(pid, started_at));

        info!(job = %job.id, pid = ?pid, cmd = %command, "job started");
        Ok(pid)
    }

    /// Stop `job_id`: polite signal, grace period, then a forced kill.
    ///
    /// A job without a registered process has its state reset to STOPPED and
    /// the call still reports failure.
    pub async fn stop(&self, job_id: &str) -> JobResult {
        let mut registry = self.registry.lock().await;

        let Some(mut process) = registry.forget(job_id) else {
            if self.store.job(job_id).is_none() {
                return JobRunnerError::job_not_found(job_id).into();
            }
            return JobRunnerError::InvalidState(format!("Job is not running: {job_id}")).into();
        };

        info!(job = %job_id, pid = ?process.pid, "stopping job");
        let outcome = terminate(
            &mut process.child,
            self.options.grace_period,
            self.options.kill_wait,
        )
        .await;

        match outcome {
            Termination::Graceful(status) => {
                debug!(job = %job_id, ?status, "job exited after termination request");
            }
            Termination::Forced(status) => {
                info!(job = %job_id, ?status, "job was force-killed");
            }
            Termination::Survived => {
                let err = JobRunnerError::TerminationFailure {
                    job: job_id.to_string(),
                    pid: process.pid.unwrap_or_default(),
                };
                warn!(job = %job_id, error = %err, "job process may still be running");
            }
        }

        process.capture.cancel();
        debug!(
            job = %job_id,
            ran_secs = (self.clock.now() - process.started_at).num_seconds(),
            "job deregistered"
        );
        JobResult::ok("Job stopped successfully")
    }

    /// Current status, checking the process on the spot.
    pub async fn status(&self, job_id: &str) -> JobStatus {
        let mut registry = self.registry.lock().await;
        match registry.observe(job_id) {
            Observed::Alive => JobStatus::Running,
            Observed::Exited(status) => status,
            Observed::NotRegistered => JobStatus::Stopped,
        }
    }

    /// Recorded runtime state without polling the process.
    pub async fn runtime_state(&self, job_id: &str) -> RuntimeState {
        self.registry.lock().await.state(job_id)
    }

    /// Refresh and project one job. `None` if the store does not know it.
    pub async fn job_view(&self, job_id: &str) -> Option<JobView> {
        let job = self.store.job(job_id)?;
        let mut registry = self.registry.lock().await;
        registry.observe(job_id);
        Some(JobView::new(&job, registry.state(job_id)))
    }

    /// Refresh every configured job and project its runtime state.
    pub async fn refresh_all_statuses(&self) -> Vec<JobView> {
        let jobs = self.store.jobs();
        let mut registry = self.registry.lock().await;
        jobs.iter()
            .map(|job| {
                registry.observe(&job.id);
                JobView::new(job, registry.state(&job.id))
            })
            .collect()
    }

    pub async fn summary(&self) -> StatusSummary {
        let views = self.refresh_all_statuses().await;
        StatusSummary::from_views(&views, self.store.apps().len())
    }

    /// Last `last_n` lines of the job's log (all of it for `None` or 0).
    ///
    /// Served from memory when the job has run in this process, otherwise from
    /// its log file. Read failures are logged and yield an empty string.
    pub fn logs(&self, job_id: &str, last_n: Option<usize>) -> String {
        if let Some(text) = self.logs.tail(job_id, last_n) {
            return text;
        }

        let path = log_file_path(&self.store.global().logs_dir, job_id);
        if !self.fs.exists(&path) {
            return String::new();
        }
        match self.fs.read_to_string(&path) {
            Ok(text) => tail_lines(&text, last_n),
            Err(e) => {
                warn!(job = %job_id, path = %path.display(), error = %e, "cannot read job log file");
                String::new()
            }
        }
    }

    /// Empty the in-memory log of `job_id`. The log file is left alone.
    pub fn clear_logs(&self, job_id: &str) -> JobResult {
        self.logs.clear(job_id);
        JobResult::ok(format!("Logs cleared for job: {job_id}"))
    }

    /// Stop every registered job.
    pub async fn stop_all(&self) -> Vec<(String, JobResult)> {
        let mut ids: Vec<String> = {
            let registry = self.registry.lock().await;
            registry.processes.keys().cloned().collect()
        };
        ids.sort();

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let res = self.stop(&id).await;
            results.push((id, res));
        }
        info!(count = results.len(), "all jobs stopped");
        results
    }

    /// Refuse new starts, stop everything, then give capture tasks a bounded
    /// time to finish. Later calls return immediately.
    pub async fn shutdown(&self) {
        {
            let mut registry = self.registry.lock().await;
            if registry.closed {
                debug!("supervisor already shut down");
                return;
            }
            registry.closed = true;
        }

        info!("shutting down supervisor");
        self.stop_all().await;

        let mut captures = std::mem::take(&mut self.registry.lock().await.captures);
        let drain = async {
            while let Some(res) = captures.join_next().await {
                if let Err(e) = res {
                    if e.is_panic() {
                        warn!(error = %e, "log capture task panicked");
                    }
                }
            }
        };
        if timeout(self.options.drain_timeout, drain).await.is_err() {
            warn!(
                remaining = captures.len(),
                "log capture tasks did not finish in time; aborting"
            );
            captures.abort_all();
        }
        info!("supervisor shut down");
    }

    /// Start every enabled continuous job.
    pub async fn start_all(&self) -> BulkStartReport {
        let mut report = BulkStartReport::default();
        let jobs = self
            .store
            .jobs()
            .into_iter()
            .filter(|job| job.enabled && job.job_type == JobType::Continuous);

        for job in jobs {
            let res = self.start(&job.id, &[]).await;
            if res.success {
                report.started.push(job.id);
            } else {
                report.failed.push(format!("{}: {}", job.id, res.message));
            }
        }
        info!(
            started = report.started.len(),
            failed = report.failed.len(),
            "bulk start finished"
        );
        report
    }

    /// Stop (if running), pause, and start again.
    pub async fn restart(&self, job_id: &str, runtime_args: &[String]) -> JobResult {
        let stopped = self.stop(job_id).await;
        debug!(job = %job_id, stopped = stopped.success, "restart: stop phase done");
        sleep(self.options.restart_delay).await;
        self.start(job_id, runtime_args).await.prefixed("Restart: ")
    }

    /// Stop the job if it runs, then delete its definition from the store.
    pub async fn remove_job(&self, job_id: &str) -> JobResult {
        if self.store.job(job_id).is_none() {
            return JobRunnerError::job_not_found(job_id).into();
        }
        let stopped = self.stop(job_id).await;
        debug!(job = %job_id, stopped = stopped.success, "remove: stop phase done");
        match self.store.remove_job(job_id) {
            Ok(_) => JobResult::ok(format!("Job deleted: {job_id}")),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppDefinition, GlobalSettings, JobsConfig, TomlConfigStore};
    use crate::exec::LaunchCommand;
    use crate::fs::MockFileSystem;
    use std::io;
    use std::path::PathBuf;
    use tokio::process::Child;

    #[derive(Debug)]
    struct RefusingLauncher;

    impl ProcessLauncher for RefusingLauncher {
        fn launch(&self, _command: &LaunchCommand) -> io::Result<Child> {
            Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
        }
    }

    fn config() -> JobsConfig {
        let mut enabled = JobDefinition::new("report", "com.example.Report");
        enabled.apps = vec!["web".into()];
        let mut disabled = JobDefinition::new("legacy", "com.example.Legacy");
        disabled.enabled = false;
        let mut orphan = JobDefinition::new("orphan", "com.example.Orphan");
        orphan.apps = vec!["web".into()];

        let mut cfg = JobsConfig {
            global: GlobalSettings {
                logs_dir: PathBuf::from("/logs"),
                ..GlobalSettings::default()
            },
            ..JobsConfig::default()
        };
        cfg.apps.insert("web".into(), AppDefinition::new("web", "Web", "/srv/web"));
        cfg.jobs = vec![enabled, disabled, orphan];
        cfg
    }

    fn supervisor(cfg: JobsConfig) -> (ProcessSupervisor, Arc<MockFileSystem>) {
        let fs = Arc::new(MockFileSystem::new());
        let store = Arc::new(TomlConfigStore::in_memory(fs.clone(), cfg));
        let sup = ProcessSupervisor::new(store, fs.clone()).with_launcher(Arc::new(RefusingLauncher));
        (sup, fs)
    }

    #[tokio::test]
    async fn unknown_and_disabled_jobs_are_refused() {
        let (sup, _) = supervisor(config());

        let res = sup.start("nope", &[]).await;
        assert!(!res.success);
        assert_eq!(res.message, "Job not found: nope");

        let res = sup.start("legacy", &[]).await;
        assert!(!res.success);
        assert_eq!(res.message, "Job is disabled: legacy");
        assert_eq!(sup.status("legacy").await, JobStatus::Stopped);
    }

    #[tokio::test]
    async fn spawn_failure_records_error_state() {
        let (sup, _) = supervisor(config());

        let res = sup.start("report", &[]).await;
        assert!(!res.success);
        assert!(res.message.starts_with("Error starting job: "), "{}", res.message);
        assert!(res.pid.is_none());

        let state = sup.runtime_state("report").await;
        assert_eq!(state.status, JobStatus::Error);
        assert!(state.pid.is_none());
        // No process was registered.
        assert_eq!(sup.status("report").await, JobStatus::Stopped);
        assert_eq!(sup.summary().await.error, 1);
    }

    #[tokio::test]
    async fn unknown_app_reference_is_a_spawn_failure() {
        let mut cfg = config();
        cfg.apps.clear();
        let (sup, _) = supervisor(cfg);

        let res = sup.start("orphan", &[]).await;
        assert!(!res.success);
        assert!(res.message.contains("unknown app 'web'"), "{}", res.message);
        assert_eq!(sup.runtime_state("orphan").await.status, JobStatus::Error);
    }

    #[tokio::test]
    async fn stop_without_a_process_resets_state_and_fails() {
        let (sup, _) = supervisor(config());
        sup.start("report", &[]).await;
        assert_eq!(sup.runtime_state("report").await.status, JobStatus::Error);

        for _ in 0..2 {
            let res = sup.stop("report").await;
            assert!(!res.success);
            assert_eq!(res.message, "Job is not running: report");
            assert_eq!(sup.runtime_state("report").await, RuntimeState::default());
        }

        assert_eq!(sup.stop("ghost").await.message, "Job not found: ghost");
    }

    #[tokio::test]
    async fn logs_fall_back_to_the_log_file() {
        let (sup, fs) = supervisor(config());
        fs.add_file("/logs/report.log", "2024-01-01 00:00:00 one\n2024-01-01 00:00:01 two\n");

        assert_eq!(sup.logs("report", Some(1)), "2024-01-01 00:00:01 two\n");
        assert_eq!(sup.logs("report", None).lines().count(), 2);
        assert_eq!(sup.logs("legacy", Some(5)), "");
    }

    #[tokio::test]
    async fn clear_logs_leaves_the_file_alone() {
        let (sup, fs) = supervisor(config());
        fs.add_file("/logs/report.log", "kept\n");

        let res = sup.clear_logs("report");
        assert!(res.success);
        assert_eq!(res.message, "Logs cleared for job: report");
        assert_eq!(sup.logs("report", None), "kept\n");
    }

    #[tokio::test]
    async fn starts_are_refused_after_shutdown() {
        let (sup, _) = supervisor(config());
        sup.shutdown().await;
        sup.shutdown().await;

        let res = sup.start("report", &[]).await;
        assert_eq!(res.message, "Supervisor is shut down");
    }

    #[tokio::test]
    async fn start_all_reports_each_continuous_job() {
        let mut cfg = config();
        for job in &mut cfg.jobs {
            job.job_type = JobType::Continuous;
        }
        let (sup, _) = supervisor(cfg);

        let report = sup.start_all().await;
        assert!(report.started.is_empty());
        // The disabled job is not even attempted.
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed[0].starts_with("report: Error starting job: "));
        assert!(!report.success());
    }

    #[tokio::test]
    async fn remove_job_deletes_the_definition() {
        let (sup, _) = supervisor(config());

        let res = sup.remove_job("legacy").await;
        assert!(res.success, "{}", res.message);
        assert_eq!(res.message, "Job deleted: legacy");
        assert!(sup.store().job("legacy").is_none());
        assert!(!sup.remove_job("legacy").await.success);
    }

    #[tokio::test]
    async fn exit_hook_installs_once() {
        let (sup, _) = supervisor(config());
        assert!(sup.install_exit_hook());
        assert!(!sup.install_exit_hook());
        assert!(sup.exit_hook().is_installed());
        assert!(!sup.exit_hook().has_fired());

        assert_eq!(sup.exit_hook().trigger().await, 0);
        assert!(sup.exit_hook().has_fired());
    }
}
