// src/clock.rs

//! Injected time source.

use std::fmt::Debug;

use chrono::{DateTime, Local, Utc};

/// Second-precision, local-time format used in front of every captured line.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn log_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(LOG_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_has_second_precision() {
        let ts = log_timestamp(Utc::now());
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(ts.len(), 19, "{ts}");
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
        assert_eq!(&ts[13..14], ":");
    }
}
