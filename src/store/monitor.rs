//! Background polling of `new/` and the registry of known maildirs.
//!
//! Each monitor is a thread that wakes every [`POLL_INTERVAL`], locks its
//! maildir, runs promotion and reports changes as [`MaildirEvent`]s on a
//! channel. Consumers drain the channel on their own thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{MailError, Result};
use crate::status::StatusSink;
use crate::store::maildir::{LoadMode, Maildir};

/// Interval between two scans of `new/`.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A maildir shared between its monitor and the consumer.
pub type SharedMaildir = Arc<Mutex<Maildir>>;

/// What a monitor observed during one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaildirEvent {
    /// `added` messages were promoted from `new/`.
    Changed { path: PathBuf, added: usize },
    /// Promotion failed; the monitor keeps polling. Sent once per run of
    /// consecutive failures.
    Failed { path: PathBuf, error: String },
}

impl MaildirEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Changed { path, .. } | Self::Failed { path, .. } => path,
        }
    }

    /// Forward the event to a status line.
    pub fn report(&self, sink: &dyn StatusSink) {
        match self {
            Self::Changed { path, added } => {
                sink.status(&format!("{added} new message(s) in {}", path.display()))
            }
            Self::Failed { path, error } => {
                sink.error(&format!("Cannot check {} for new mail: {error}", path.display()))
            }
        }
    }
}

/// Owner of a running monitor thread. Stopping consumes the handle;
/// dropping it stops the thread too.
#[derive(Debug)]
pub struct MonitorHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Signal the thread and wait for it. A poll in progress finishes first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Maildir monitor thread panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start polling `maildir` every `interval`, sending changes to `events`.
///
/// The thread exits when stopped or when every receiver of `events` is gone.
pub fn spawn_monitor(
    maildir: SharedMaildir,
    interval: Duration,
    events: Sender<MaildirEvent>,
) -> Result<MonitorHandle> {
    let (stop_tx, stop_rx) = channel::bounded(1);
    let path = maildir.lock().path().to_path_buf();
    let thread = thread::Builder::new()
        .name(format!("monitor:{}", path.display()))
        .spawn(move || poll_loop(maildir, interval, stop_rx, events))
        .map_err(|e| MailError::Monitor(format!("cannot spawn thread for {}: {e}", path.display())))?;
    Ok(MonitorHandle {
        stop: Some(stop_tx),
        thread: Some(thread),
    })
}

fn poll_loop(
    maildir: SharedMaildir,
    interval: Duration,
    stop: Receiver<()>,
    events: Sender<MaildirEvent>,
) {
    let ticker = channel::tick(interval);
    // Set while promotion keeps failing; only the first failure is sent.
    let mut failing = false;
    loop {
        crossbeam::select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {
                let event = poll_once(&maildir);
                let failed = matches!(event, Some(MaildirEvent::Failed { .. }));
                let repeated = failed && failing;
                failing = failed;
                let Some(event) = event else {
                    continue;
                };
                if repeated {
                    debug!(path = %event.path().display(), "Promotion still failing");
                    continue;
                }
                if events.send(event).is_err() {
                    debug!("Event receiver dropped, stopping monitor");
                    break;
                }
            }
        }
    }
}

/// One promotion pass. `None` when nothing happened.
pub fn poll_once(maildir: &SharedMaildir) -> Option<MaildirEvent> {
    let mut md = maildir.lock();
    let before = md.len();
    let path = md.path().to_path_buf();
    match md.promote_new() {
        Ok(true) => Some(MaildirEvent::Changed {
            path,
            added: md.len() - before,
        }),
        Ok(false) => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "New-mail check failed");
            Some(MaildirEvent::Failed {
                path,
                error: e.to_string(),
            })
        }
    }
}

// ── Registry ────────────────────────────────────────────────────

/// A registered maildir with its optional monitor.
#[derive(Debug)]
pub struct KnownMaildir {
    maildir: SharedMaildir,
    monitor: Option<MonitorHandle>,
}

impl KnownMaildir {
    pub fn maildir(&self) -> &SharedMaildir {
        &self.maildir
    }

    pub fn is_monitored(&self) -> bool {
        self.monitor.as_ref().is_some_and(MonitorHandle::is_running)
    }
}

/// Message counts for a sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MaildirCount {
    pub path: PathBuf,
    pub total: usize,
    pub unread: usize,
}

/// Every maildir the user configured. At most one is active at a time.
pub struct KnownMaildirs {
    entries: Vec<KnownMaildir>,
    active: Option<usize>,
    events_tx: Sender<MaildirEvent>,
    events_rx: Receiver<MaildirEvent>,
}

impl KnownMaildirs {
    /// Open every path; the first is active, the rest passive.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let mut entries = Vec::with_capacity(paths.len());
        for (i, path) in paths.iter().enumerate() {
            let mode = if i == 0 {
                LoadMode::Active
            } else {
                LoadMode::Passive
            };
            entries.push(KnownMaildir {
                maildir: Arc::new(Mutex::new(Maildir::open(path, mode)?)),
                monitor: None,
            });
        }
        let (events_tx, events_rx) = channel::unbounded();
        Ok(Self {
            active: if entries.is_empty() { None } else { Some(0) },
            entries,
            events_tx,
            events_rx,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&KnownMaildir> {
        self.entries.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&SharedMaildir> {
        self.active.and_then(|i| self.entries.get(i)).map(|k| &k.maildir)
    }

    /// Make `index` the active maildir and demote the previous one.
    /// Returns `false` for an unknown index.
    pub fn activate(&mut self, index: usize) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        if self.active == Some(index) {
            return true;
        }
        entry.maildir.lock().set_mode(LoadMode::Active);
        if let Some(previous) = self.active.and_then(|i| self.entries.get(i)) {
            previous.maildir.lock().set_mode(LoadMode::Passive);
        }
        self.active = Some(index);
        true
    }

    pub fn counts(&self) -> Vec<MaildirCount> {
        self.entries
            .iter()
            .map(|k| {
                let md = k.maildir.lock();
                MaildirCount {
                    path: md.path().to_path_buf(),
                    total: md.len(),
                    unread: md.unread_count(),
                }
            })
            .collect()
    }

    /// Start a monitor for every maildir that does not have one.
    pub fn start_monitors(&mut self, interval: Duration) -> Result<()> {
        for entry in self.entries.iter_mut().filter(|k| k.monitor.is_none()) {
            let handle = spawn_monitor(entry.maildir.clone(), interval, self.events_tx.clone())?;
            entry.monitor = Some(handle);
        }
        Ok(())
    }

    pub fn stop_monitors(&mut self) {
        for entry in &mut self.entries {
            if let Some(handle) = entry.monitor.take() {
                handle.stop();
            }
        }
    }

    /// Events from all monitors.
    pub fn events(&self) -> &Receiver<MaildirEvent> {
        &self.events_rx
    }
}
