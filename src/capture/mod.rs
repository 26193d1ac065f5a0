// src/capture/mod.rs

//! Output capture for supervised processes.
//!
//! - [`buffer`] is the bounded per-job text buffer.
//! - [`store`] maps job ids to their current buffer.
//! - [`task`] runs one capture task per process instance, writing each
//!   timestamped line to the job's log file and its buffer.

pub mod buffer;
pub mod store;
pub mod task;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub use buffer::{DEFAULT_CAP, DEFAULT_TRIM_UNIT, LogBuffer, tail_lines};
pub use store::{LogStore, SharedLogBuffer};
pub use task::{CaptureHandle, LogSink, OutputStream, spawn_capture};

/// Lock a std mutex, recovering the data if a holder panicked.
///
/// Buffers only hold text, so a poisoned lock is still safe to read.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Path of the persistent log file for `job_id` under `logs_dir`.
///
/// Characters outside `[A-Za-z0-9._-]` are replaced with `_` so an id can
/// never escape the directory.
pub fn log_file_path(logs_dir: &Path, job_id: &str) -> PathBuf {
    let safe: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.chars().all(|c| c == '.') {
        safe.replace('.', "_")
    } else {
        safe
    };
    logs_dir.join(format!("{safe}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_map_directly() {
        assert_eq!(
            log_file_path(Path::new("/var/logs"), "nightly-report_2"),
            PathBuf::from("/var/logs/nightly-report_2.log")
        );
    }

    #[test]
    fn path_separators_are_neutralised() {
        let p = log_file_path(Path::new("/var/logs"), "../etc/passwd");
        assert_eq!(p, PathBuf::from("/var/logs/.._etc_passwd.log"));
        assert_eq!(p.parent(), Some(Path::new("/var/logs")));

        assert_eq!(
            log_file_path(Path::new("/l"), ".."),
            PathBuf::from("/l/__.log")
        );
    }
}
