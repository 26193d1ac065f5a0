// src/supervisor/options.rs

use std::time::Duration;

use crate::capture::{DEFAULT_CAP, DEFAULT_TRIM_UNIT};

/// Timing and sizing knobs of a [`super::ProcessSupervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// How long `stop` waits after the polite signal.
    pub grace_period: Duration,
    /// How long `stop` waits after the forced kill.
    pub kill_wait: Duration,
    /// How long `shutdown` lets capture tasks drain before aborting them.
    pub drain_timeout: Duration,
    /// Pause between the stop and start halves of `restart`.
    pub restart_delay: Duration,
    pub log_cap: usize,
    pub log_trim_unit: usize,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            kill_wait: Duration::from_secs(2),
            drain_timeout: Duration::from_secs(10),
            restart_delay: Duration::from_secs(1),
            log_cap: DEFAULT_CAP,
            log_trim_unit: DEFAULT_TRIM_UNIT,
        }
    }
}
