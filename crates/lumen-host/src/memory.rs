//! Deterministic in-memory host.
//!
//! `MemoryHost` backs the test suites and any embedder that pumps the
//! server loop itself. Nothing runs spontaneously: queued timer and
//! immediate jobs execute only when the owner calls one of the stepping
//! methods, so a test can observe every intermediate state of the
//! diagnostics scheduler.
//!
//! Timer jobs run in (delay, insertion) order; under manual stepping the
//! delay orders work, it does not gate it. Immediate jobs run in FIFO
//! order. Each stepping call drains a snapshot of its queue, so work a job
//! schedules while running lands in the next step rather than extending
//! the current one.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::Duration;

use parking_lot::Mutex;

use lumen_core::{canonical_key, normalize_slashes};

use crate::watch::{FileWatchKind, WatchCallback, WatcherHandle};
use crate::{Host, ImmediateHandle, Job, TimerHandle};

struct MemoryFile {
    content: String,
}

struct WatchEntry {
    id: u64,
    callback: WatchCallback,
}

struct TimerEntry {
    id: u64,
    delay: Duration,
    job: Job,
}

#[derive(Default)]
struct State {
    files: HashMap<String, MemoryFile>,
    watchers: HashMap<String, Vec<WatchEntry>>,
    timers: Vec<TimerEntry>,
    immediates: VecDeque<(u64, Job)>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct MemoryHost {
    case_sensitive: bool,
    state: Mutex<State>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// A case-insensitive host, the common editor-facing configuration.
    pub fn new() -> Self {
        Self::with_case_sensitivity(false)
    }

    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            state: Mutex::new(State::default()),
        }
    }

    fn key(&self, path: &str) -> String {
        canonical_key(path, self.case_sensitive)
    }

    /// Create or replace a file, notifying watchers of the path.
    pub fn write_file(&self, path: &str, content: impl Into<String>) {
        let display = normalize_slashes(path);
        let key = self.key(path);
        let kind = {
            let mut state = self.state.lock();
            let existed = state.files.contains_key(&key);
            state.files.insert(
                key.clone(),
                MemoryFile {
                    content: content.into(),
                },
            );
            if existed {
                FileWatchKind::Changed
            } else {
                FileWatchKind::Created
            }
        };
        self.notify_watchers(&key, &display, kind);
    }

    /// Remove a file, notifying watchers of the path. Removing a missing
    /// file is a no-op.
    pub fn remove_file(&self, path: &str) {
        let display = normalize_slashes(path);
        let key = self.key(path);
        let removed = self.state.lock().files.remove(&key).is_some();
        if removed {
            self.notify_watchers(&key, &display, FileWatchKind::Deleted);
        }
    }

    fn notify_watchers(&self, key: &str, display_path: &str, kind: FileWatchKind) {
        // Collect callbacks under the lock, invoke outside it: callbacks
        // re-enter the host to schedule work or adjust watches.
        let callbacks: Vec<WatchCallback> = {
            let state = self.state.lock();
            state
                .watchers
                .get(key)
                .map(|entries| entries.iter().map(|e| e.callback.clone()).collect())
                .unwrap_or_default()
        };
        tracing::debug!(
            target = "lumen.host",
            path = display_path,
            kind = ?kind,
            watchers = callbacks.len(),
            "file event"
        );
        for callback in callbacks {
            callback(display_path, kind);
        }
    }

    /// Number of jobs currently queued on the timer queue.
    pub fn timer_count(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Number of jobs currently queued on the immediate queue.
    pub fn immediate_count(&self) -> usize {
        self.state.lock().immediates.len()
    }

    /// Number of active watch subscriptions for a path.
    pub fn watcher_count(&self, path: &str) -> usize {
        let key = self.key(path);
        self.state
            .lock()
            .watchers
            .get(&key)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Run every job currently on the timer queue, in (delay, insertion)
    /// order. Jobs queued while running are left for the next call.
    pub fn run_pending_timers(&self) {
        let mut due: Vec<TimerEntry> = {
            let mut state = self.state.lock();
            std::mem::take(&mut state.timers)
        };
        due.sort_by_key(|entry| (entry.delay, entry.id));
        for entry in due {
            (entry.job)();
        }
    }

    /// Run every job currently on the immediate queue, FIFO. Jobs queued
    /// while running are left for the next call.
    pub fn run_pending_immediates(&self) {
        let batch: Vec<(u64, Job)> = {
            let mut state = self.state.lock();
            state.immediates.drain(..).collect()
        };
        for (_, job) in batch {
            job();
        }
    }

    /// Pump both queues until neither has work left.
    pub fn run_to_quiescence(&self) {
        loop {
            let mut ran = false;
            if self.timer_count() > 0 {
                self.run_pending_timers();
                ran = true;
            }
            while self.immediate_count() > 0 {
                self.run_pending_immediates();
                ran = true;
            }
            if !ran {
                break;
            }
        }
    }
}

impl Host for MemoryHost {
    fn read_file(&self, path: &str) -> io::Result<String> {
        let key = self.key(path);
        let state = self.state.lock();
        match state.files.get(&key) {
            Some(file) => Ok(file.content.clone()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {path}"),
            )),
        }
    }

    fn file_exists(&self, path: &str) -> bool {
        let key = self.key(path);
        self.state.lock().files.contains_key(&key)
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.case_sensitive
    }

    fn watch_file(&self, path: &str, callback: WatchCallback) -> WatcherHandle {
        let key = self.key(path);
        let mut state = self.state.lock();
        let id = state.next_id();
        state
            .watchers
            .entry(key)
            .or_default()
            .push(WatchEntry { id, callback });
        WatcherHandle::new(id)
    }

    fn unwatch_file(&self, handle: WatcherHandle) {
        let mut state = self.state.lock();
        for entries in state.watchers.values_mut() {
            entries.retain(|entry| entry.id != handle.0);
        }
        state.watchers.retain(|_, entries| !entries.is_empty());
    }

    fn schedule_timeout(&self, delay: Duration, job: Job) -> TimerHandle {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.timers.push(TimerEntry { id, delay, job });
        TimerHandle(id)
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        let mut state = self.state.lock();
        state.timers.retain(|entry| entry.id != handle.0);
    }

    fn schedule_immediate(&self, job: Job) -> ImmediateHandle {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.immediates.push_back((id, job));
        ImmediateHandle(id)
    }

    fn clear_immediate(&self, handle: ImmediateHandle) {
        let mut state = self.state.lock();
        state.immediates.retain(|(id, _)| *id != handle.0);
    }
}
