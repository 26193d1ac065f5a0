// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] turns definitions into a [`LaunchCommand`].
//! - [`launcher`] provides the `ProcessLauncher` trait and the production
//!   `TokioLauncher`, which tests can replace or wrap.
//! - [`terminate`] implements graceful-then-forced termination.

pub mod command;
pub mod launcher;
pub mod terminate;

pub use command::{CLASSPATH_SEPARATOR, LaunchCommand, build_classpath, build_command, resolve_apps};
pub use launcher::{ProcessLauncher, TokioLauncher};
pub use terminate::{Termination, force_kill, terminate};
