// src/exec/command.rs

//! Launch command construction.
//!
//! [`build_command`] is a pure function of its inputs: it only *queries* the
//! injected [`FileSystem`] (to see whether an app ships a `lib` directory), so
//! it is safe to call concurrently and repeatedly.

use std::fmt;
use std::path::{MAIN_SEPARATOR, PathBuf};

use crate::config::{AppDefinition, ConfigStore, GlobalSettings, JobDefinition, RUNTIME_HOME_VAR};
use crate::errors::{JobRunnerError, Result};
use crate::fs::FileSystem;

/// Separator between classpath entries on this platform.
pub const CLASSPATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Fully resolved process launch: program, ordered arguments, extra
/// environment and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Added on top of the inherited host environment.
    pub env: Vec<(String, String)>,
    pub working_dir: PathBuf,
}

impl LaunchCommand {
    /// Program followed by its arguments.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(self.args.len() + 1);
        tokens.push(self.program.display().to_string());
        tokens.extend(self.args.iter().cloned());
        tokens
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(" "))
    }
}

/// Look up every app a job references, in declared order.
///
/// An id the store does not know is a spawn failure: the classpath cannot be
/// resolved.
pub fn resolve_apps(job: &JobDefinition, store: &dyn ConfigStore) -> Result<Vec<AppDefinition>> {
    job.apps
        .iter()
        .map(|id| {
            store.app(id).ok_or_else(|| {
                JobRunnerError::SpawnFailure(format!(
                    "job '{}' references unknown app '{}'",
                    job.id, id
                ))
            })
        })
        .collect()
}

/// Build the ordered launch command for `job`.
///
/// Order:
/// 1. executable
/// 2. global launch options, then per-job options
/// 3. `-classpath <entries>`
/// 4. main class
/// 5. configured params, then runtime arguments
pub fn build_command(
    job: &JobDefinition,
    apps: &[AppDefinition],
    global: &GlobalSettings,
    runtime_args: &[String],
    fs: &dyn FileSystem,
) -> LaunchCommand {
    let mut args = Vec::new();

    args.extend(split_options(&global.java_opts));
    if let Some(opts) = &job.java_opts {
        args.extend(split_options(opts));
    }

    args.push("-classpath".to_string());
    args.push(build_classpath(apps, global, fs));

    args.push(job.main_class.clone());
    args.extend(job.params.iter().cloned());
    args.extend(runtime_args.iter().cloned());

    LaunchCommand {
        program: global.executable(),
        args,
        env: vec![(
            RUNTIME_HOME_VAR.to_string(),
            global.java_home.display().to_string(),
        )],
        working_dir: global.logs_dir.clone(),
    }
}

/// Classes dir and optional `lib/*` per app, then the config dir once.
pub fn build_classpath(apps: &[AppDefinition], global: &GlobalSettings, fs: &dyn FileSystem) -> String {
    let mut entries = Vec::new();

    for app in apps {
        entries.push(app.classes_dir().display().to_string());
        let lib = app.lib_dir();
        if fs.is_dir(&lib) {
            entries.push(format!("{}{}*", lib.display(), MAIN_SEPARATOR));
        }
    }

    if !global.config_dir.as_os_str().is_empty() {
        entries.push(global.config_dir.display().to_string());
    }

    entries.join(&CLASSPATH_SEPARATOR.to_string())
}

fn split_options(opts: &str) -> impl Iterator<Item = String> + '_ {
    opts.split_whitespace().map(str::to_string)
}
