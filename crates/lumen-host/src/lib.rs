//! Host abstraction for Lumen.
//!
//! The server core never touches the OS directly: file reads, file
//! watching, and deferred execution all go through [`Host`]. The trait is
//! intentionally small so it can be implemented for different backends;
//! [`MemoryHost`] is the deterministic in-memory implementation used by
//! tests and embedders that drive the server loop themselves.
//!
//! Deferred execution is modelled as two cooperative queues:
//!
//! - a coarse, delay-ordered *timer queue* (`schedule_timeout`), used to
//!   debounce expensive work, and
//! - a FIFO *immediate queue* (`schedule_immediate`), used to interleave
//!   fine-grained steps with other pending work.
//!
//! Jobs only ever run at queue boundaries, never mid-computation, which is
//! what makes the ordering guarantees of the diagnostics scheduler hold
//! under a synchronous, single-threaded harness.

mod memory;
mod watch;

use std::io;
use std::time::Duration;

pub use memory::MemoryHost;
pub use watch::{FileWatchKind, WatchCallback, WatcherHandle};

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send>;

/// Handle to a queued timer job; pass to [`Host::clear_timeout`] to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) u64);

/// Handle to a queued immediate job; pass to [`Host::clear_immediate`] to
/// cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImmediateHandle(pub(crate) u64);

/// The environment the server runs in: files, watches, and the two
/// deferral queues.
///
/// Paths are display-spelled strings; implementations apply their own
/// case-sensitivity rule, reported through
/// [`Host::use_case_sensitive_file_names`] so the core can key state
/// consistently.
pub trait Host: Send + Sync {
    /// Reads the file contents as UTF-8 text.
    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Returns whether a path exists.
    fn file_exists(&self, path: &str) -> bool;

    /// Whether this host distinguishes file-name case.
    fn use_case_sensitive_file_names(&self) -> bool {
        false
    }

    /// Subscribe to change notifications for a single path. The path does
    /// not need to exist yet; a later creation is delivered as
    /// [`FileWatchKind::Created`].
    fn watch_file(&self, path: &str, callback: WatchCallback) -> WatcherHandle;

    /// Cancel a watch subscription. Unknown or already-removed handles are
    /// ignored.
    fn unwatch_file(&self, handle: WatcherHandle);

    /// Queue `job` on the timer queue, to run no earlier than `delay`
    /// after the current instant.
    fn schedule_timeout(&self, delay: Duration, job: Job) -> TimerHandle;

    /// Cancel a queued timer job. Unknown handles are ignored.
    fn clear_timeout(&self, handle: TimerHandle);

    /// Queue `job` on the FIFO immediate queue.
    fn schedule_immediate(&self, job: Job) -> ImmediateHandle;

    /// Cancel a queued immediate job. Unknown handles are ignored.
    fn clear_immediate(&self, handle: ImmediateHandle);
}
