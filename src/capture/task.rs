// src/capture/task.rs

//! Per-process log capture task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::clock::{Clock, log_timestamp};

use super::lock;
use super::store::SharedLogBuffer;

/// One output stream of a child (stdout or stderr).
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

const LINE_CHANNEL_CAPACITY: usize = 256;

/// Where captured lines go.
#[derive(Debug, Clone)]
pub struct LogSink {
    pub job_id: String,
    pub buffer: SharedLogBuffer,
    pub file_path: PathBuf,
    pub clock: Arc<dyn Clock>,
}

/// Handle kept by the supervisor for a running capture task.
///
/// - `cancel` requests that the task stop reading and release its file.
///   Dropping it without sending does **not** cancel: the task keeps draining
///   until the streams close.
/// - stragglers are aborted through the owning `JoinSet` at shutdown.
#[derive(Debug)]
pub struct CaptureHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: AbortHandle,
}

impl CaptureHandle {
    /// Ask the task to stop. Returns `false` if it had already finished.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the capture task for one process instance into `tasks`.
///
/// All `streams` are read concurrently and their lines interleaved into a
/// single log, in arrival order.
pub fn spawn_capture(
    tasks: &mut JoinSet<()>,
    sink: LogSink,
    streams: Vec<OutputStream>,
) -> CaptureHandle {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let task = tasks.spawn(run_capture(sink, streams, cancel_rx));
    CaptureHandle {
        cancel: Some(cancel_tx),
        task,
    }
}

async fn run_capture(sink: LogSink, streams: Vec<OutputStream>, mut cancel_rx: oneshot::Receiver<()>) {
    let (line_tx, mut line_rx) = mpsc::channel::<String>(LINE_CHANNEL_CAPACITY);
    let _readers = ReaderTasks(
        streams
            .into_iter()
            .map(|stream| tokio::spawn(forward_lines(stream, line_tx.clone())))
            .collect(),
    );
    drop(line_tx);

    let mut file = LogFile::open(&sink.job_id, &sink.file_path).await;
    let mut cancel_open = true;

    loop {
        tokio::select! {
            res = &mut cancel_rx, if cancel_open => match res {
                Ok(()) => {
                    debug!(job = %sink.job_id, "log capture cancelled");
                    break;
                }
                // Handle dropped without a request: keep draining.
                Err(_) => cancel_open = false,
            },
            line = line_rx.recv() => match line {
                Some(line) => record_line(&sink, &mut file, &line).await,
                None => {
                    debug!(job = %sink.job_id, "output closed; log capture finished");
                    break;
                }
            },
        }
    }

    file.close().await;
}

async fn record_line(sink: &LogSink, file: &mut LogFile, line: &str) {
    let entry = format!("{} {}\n", log_timestamp(sink.clock.now()), line);
    file.append(&sink.job_id, &entry).await;
    lock(&sink.buffer).append(&entry);
}

/// Read `stream` line by line and forward each line (without its newline).
///
/// Invalid UTF-8 is replaced rather than ending the stream, so a binary blob
/// on stdout cannot stall the child on a full pipe.
async fn forward_lines(stream: OutputStream, tx: mpsc::Sender<String>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "error reading process output");
                break;
            }
        }
    }
}

/// Aborts the reader tasks when the capture task ends, however it ends.
struct ReaderTasks(Vec<JoinHandle<()>>);

impl Drop for ReaderTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Append-only job log file. Degrades to a no-op after the first failure.
struct LogFile {
    file: Option<File>,
    path: PathBuf,
}

impl LogFile {
    async fn open(job_id: &str, path: &Path) -> Self {
        let file = match OpenOptions::new().create(true).append(true).open(path).await {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(
                    job = %job_id,
                    path = %path.display(),
                    error = %e,
                    "cannot open job log file; keeping logs in memory only"
                );
                None
            }
        };
        Self {
            file,
            path: path.to_path_buf(),
        }
    }

    async fn append(&mut self, job_id: &str, entry: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let res = async {
            file.write_all(entry.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = res {
            warn!(
                job = %job_id,
                path = %self.path.display(),
                error = %e,
                "writing job log file failed; keeping logs in memory only"
            );
            self.file = None;
        }
    }

    async fn close(mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
        }
    }
}
