// src/capture/store.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::buffer::LogBuffer;
use super::lock;

/// A job's buffer, shared between its capture task and queries.
pub type SharedLogBuffer = Arc<Mutex<LogBuffer>>;

/// In-memory buffers for currently-or-recently-running jobs.
///
/// A buffer is replaced when its job starts again and otherwise kept after
/// the process exits, so logs stay queryable from memory until the next run.
#[derive(Debug, Clone)]
pub struct LogStore {
    buffers: Arc<Mutex<HashMap<String, SharedLogBuffer>>>,
    cap: usize,
    trim_unit: usize,
}

impl LogStore {
    pub fn new(cap: usize, trim_unit: usize) -> Self {
        Self {
            buffers: Arc::new(Mutex::new(HashMap::new())),
            cap,
            trim_unit,
        }
    }

    /// Install a fresh, empty buffer for `job_id` and return it.
    pub fn reset(&self, job_id: &str) -> SharedLogBuffer {
        let buffer = Arc::new(Mutex::new(LogBuffer::new(self.cap, self.trim_unit)));
        lock(&self.buffers).insert(job_id.to_string(), Arc::clone(&buffer));
        buffer
    }

    pub fn get(&self, job_id: &str) -> Option<SharedLogBuffer> {
        lock(&self.buffers).get(job_id).cloned()
    }

    /// Tail of the in-memory buffer, or `None` if the job has none.
    pub fn tail(&self, job_id: &str, last_n: Option<usize>) -> Option<String> {
        let buffer = self.get(job_id)?;
        let text = lock(&buffer).tail(last_n);
        Some(text)
    }

    /// Empty the buffer of `job_id`. Returns whether one existed.
    pub fn clear(&self, job_id: &str) -> bool {
        match self.get(job_id) {
            Some(buffer) => {
                lock(&buffer).clear();
                true
            }
            None => false,
        }
    }
}
