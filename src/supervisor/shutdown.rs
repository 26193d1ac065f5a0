// src/supervisor/shutdown.rs

//! Host-exit hook: the last line of defence when `shutdown()` never runs.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::force_kill;

use super::registry::Registry;

/// Force-kills every registered process when the host asks us to exit.
///
/// - [`install`](Self::install) starts listening for termination signals
///   (SIGTERM and SIGHUP on unix, Ctrl-C elsewhere). It only does so once per
///   coordinator. Once the hook has run, the host exits with the conventional
///   `128 + signo` status unless something holds a [`subscribe`](Self::subscribe)
///   receiver, in which case exiting is left to that subscriber.
/// - [`trigger`](Self::trigger) is the hook body. It can also be called
///   directly, and is a no-op for processes a concurrent `stop` already
///   removed.
/// - [`subscribe`](Self::subscribe) lets a front end learn that the hook
///   fired so it can exit.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct Inner {
    registry: Arc<AsyncMutex<Registry>>,
    installed: AtomicBool,
    fired: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub(crate) fn new(registry: Arc<AsyncMutex<Registry>>) -> Self {
        let (fired, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                registry,
                installed: AtomicBool::new(false),
                fired,
            }),
            listener: Mutex::new(None),
        }
    }

    /// Start the signal listener. Returns `true` only for the call that
    /// actually installed it. Must be called from within a Tokio runtime.
    pub fn install(&self) -> bool {
        if self.inner.installed.swap(true, Ordering::SeqCst) {
            debug!("exit hook already installed");
            return false;
        }

        // Registered before returning so no signal slips past the hook.
        let mut signals = match ExitSignals::listen() {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, "cannot listen for exit signals; exit hook disabled");
                return true;
            }
        };

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let signal = match signals.recv().await {
                Ok(signal) => signal,
                Err(e) => {
                    warn!(error = %e, "exit signal listener failed; exit hook disabled");
                    return;
                }
            };
            info!(signal = signal.name(), "exit signal received; killing supervised processes");
            inner.trigger().await;

            if let Some(code) = inner.exit_code_if_unwatched(signal) {
                warn!(signal = signal.name(), code, "nothing is watching the exit hook; exiting");
                std::process::exit(code);
            }
        });

        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        info!("exit hook installed");
        true
    }

    pub fn is_installed(&self) -> bool {
        self.inner.installed.load(Ordering::SeqCst)
    }

    /// Run the hook body now. Returns how many processes were killed.
    pub async fn trigger(&self) -> usize {
        self.inner.trigger().await
    }

    pub fn has_fired(&self) -> bool {
        *self.inner.fired.borrow()
    }

    /// Receiver that flips to `true` once the hook has run.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.fired.subscribe()
    }
}

impl Inner {
    async fn trigger(&self) -> usize {
        let mut registry = self.registry.lock().await;
        let ids: Vec<String> = registry.processes.keys().cloned().collect();

        let mut killed = 0;
        for id in ids {
            // Already gone if a stop finished first.
            let Some(mut process) = registry.forget(&id) else {
                continue;
            };
            match force_kill(&mut process.child) {
                Ok(()) => {
                    killed += 1;
                    debug!(job = %id, pid = ?process.pid, "exit hook killed job process");
                }
                Err(e) => {
                    warn!(job = %id, pid = ?process.pid, error = %e, "exit hook failed to kill job process");
                }
            }
            process.capture.cancel();
        }

        self.fired.send_replace(true);
        killed
    }

    /// Exit status the host should leave with, or `None` when a subscriber
    /// takes over exiting.
    fn exit_code_if_unwatched(&self, signal: ExitSignal) -> Option<i32> {
        (self.fired.receiver_count() == 0).then(|| signal.exit_code())
    }
}

impl Drop for ShutdownCoordinator {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            handle.abort();
        }
    }
}

/// Termination signals the hook reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitSignal {
    #[cfg_attr(not(unix), allow(dead_code))]
    Terminate,
    #[cfg_attr(not(unix), allow(dead_code))]
    Hangup,
    #[cfg_attr(unix, allow(dead_code))]
    Interrupt,
}

impl ExitSignal {
    fn name(self) -> &'static str {
        match self {
            ExitSignal::Terminate => "SIGTERM",
            ExitSignal::Hangup => "SIGHUP",
            ExitSignal::Interrupt => "SIGINT",
        }
    }

    fn exit_code(self) -> i32 {
        let signo = match self {
            ExitSignal::Hangup => 1,
            ExitSignal::Interrupt => 2,
            ExitSignal::Terminate => 15,
        };
        128 + signo
    }
}

#[cfg(unix)]
struct ExitSignals {
    term: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ExitSignals {
    fn listen() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            term: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) -> io::Result<ExitSignal> {
        tokio::select! {
            _ = self.term.recv() => Ok(ExitSignal::Terminate),
            _ = self.hangup.recv() => Ok(ExitSignal::Hangup),
        }
    }
}

#[cfg(not(unix))]
struct ExitSignals;

#[cfg(not(unix))]
impl ExitSignals {
    fn listen() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> io::Result<ExitSignal> {
        tokio::signal::ctrl_c().await?;
        Ok(ExitSignal::Interrupt)
    }
}
