// src/lib.rs

pub mod capture;
pub mod cli;
pub mod clock;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod supervisor;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigStore, TomlConfigStore};
use crate::exec::{build_command, resolve_apps};
use crate::fs::{FileSystem, RealFileSystem};
use crate::supervisor::{JobView, ProcessSupervisor};
use crate::types::JobStatus;

/// How often `run` and `serve` look at their jobs.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config store
/// - supervisor (+ exit hook for long-running commands)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let store: Arc<dyn ConfigStore> = Arc::new(TomlConfigStore::open(fs.clone(), &args.config)?);
    let supervisor = ProcessSupervisor::new(store, fs);

    match args.command {
        Command::List { json } => list_jobs(&supervisor, json).await,
        Command::Command { job, args } => print_command(&supervisor, &job, &args),
        Command::Run { job, args } => run_job(&supervisor, &job, &args).await,
        Command::Serve => serve(&supervisor).await,
        Command::Logs { job, lines } => {
            if supervisor.store().job(&job).is_none() {
                bail!("Job not found: {job}");
            }
            print!("{}", supervisor.logs(&job, lines));
            Ok(())
        }
    }
}

async fn list_jobs(supervisor: &ProcessSupervisor, json: bool) -> Result<()> {
    let views = supervisor.refresh_all_statuses().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("no jobs configured");
        return Ok(());
    }
    println!("{:<24} {:<10} {:<8} {:<10} {}", "ID", "TYPE", "ENABLED", "STATUS", "NAME");
    for view in &views {
        print_view(view);
    }
    Ok(())
}

fn print_view(view: &JobView) {
    println!(
        "{:<24} {:<10} {:<8} {:<10} {}",
        view.id,
        view.job_type.as_str(),
        view.enabled,
        view.status(),
        view.name
    );
}

fn print_command(supervisor: &ProcessSupervisor, job_id: &str, runtime_args: &[String]) -> Result<()> {
    let store = supervisor.store();
    let Some(job) = store.job(job_id) else {
        bail!("Job not found: {job_id}");
    };
    let apps = resolve_apps(&job, store.as_ref())?;
    let command = build_command(&job, &apps, &store.global(), runtime_args, &RealFileSystem);

    println!("{command}");
    for (key, value) in &command.env {
        println!("  env {key}={value}");
    }
    println!("  cwd {}", command.working_dir.display());
    Ok(())
}

/// Start one job and wait for it to finish (or for an interruption).
async fn run_job(supervisor: &ProcessSupervisor, job_id: &str, runtime_args: &[String]) -> Result<()> {
    // Subscribed first: a subscriber keeps the hook from exiting the process.
    let mut exit_hook = supervisor.exit_hook().subscribe();
    supervisor.install_exit_hook();

    let started = supervisor.start(job_id, runtime_args).await;
    if !started.success {
        bail!(started.message);
    }
    info!(job = %job_id, pid = ?started.pid, "job running; Ctrl-C stops it");

    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let final_status = loop {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!(job = %job_id, "interrupted; stopping job");
                break JobStatus::Stopped;
            }
            _ = hook_fired(&mut exit_hook) => break JobStatus::Stopped,
            _ = ticker.tick() => {
                let status = supervisor.status(job_id).await;
                if status != JobStatus::Running {
                    break supervisor.runtime_state(job_id).await.status;
                }
            }
        }
    };

    supervisor.shutdown().await;
    print!("{}", supervisor.logs(job_id, None));

    if final_status == JobStatus::Error {
        bail!("job {job_id} exited with a failure status");
    }
    Ok(())
}

/// Start every continuous job and keep them supervised until interrupted.
async fn serve(supervisor: &ProcessSupervisor) -> Result<()> {
    let mut exit_hook = supervisor.exit_hook().subscribe();
    supervisor.install_exit_hook();

    let report = supervisor.start_all().await;
    for id in &report.started {
        info!(job = %id, "started");
    }
    for failure in &report.failed {
        warn!("{failure}");
    }

    let mut ticker = interval(POLL_INTERVAL * 10);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!("interrupted; shutting down");
                break;
            }
            _ = hook_fired(&mut exit_hook) => {
                info!("exit hook fired; shutting down");
                break;
            }
            _ = ticker.tick() => {
                let summary = supervisor.summary().await;
                debug!(
                    running = summary.running,
                    stopped = summary.stopped,
                    error = summary.error,
                    "job status"
                );
            }
        }
    }

    supervisor.shutdown().await;
    Ok(())
}

/// Resolves once the exit hook has run; never resolves if it cannot.
async fn hook_fired(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|fired| *fired).await.is_err() {
        std::future::pending::<()>().await;
    }
}
