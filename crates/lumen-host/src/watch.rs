use std::sync::Arc;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileWatchKind {
    Created,
    Changed,
    Deleted,
}

/// Callback invoked when a watched path changes. Receives the display path
/// the event applies to.
pub type WatchCallback = Arc<dyn Fn(&str, FileWatchKind) + Send + Sync>;

/// Handle identifying one watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherHandle(pub(crate) u64);

impl WatcherHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}
