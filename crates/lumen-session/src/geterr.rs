//! Deferred diagnostics scheduling.
//!
//! A geterr request becomes an ordered sequence of (file, category) steps:
//! file 1 syntax, file 1 semantic, file 1 suggestion, file 2 syntax, and
//! so on. The first step is debounced on the timer queue; every later step
//! runs from the immediate queue so other pending work can interleave. A
//! newer request supersedes the whole older one: superseded steps never
//! run and never emit, not even the completion event.
//!
//! Supersession is a generation counter rather than a cancellation flag
//! per step. Each queued step captures the generation it belongs to and
//! re-checks it on entry, so a stale job that still fires (the queue had
//! already snapshot it) exits without effect. Steps also re-fetch the
//! file's current project on every entry instead of holding an engine
//! handle across a yield; a project reload between steps is invisible
//! beyond the fresher results.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use lumen_check::CheckCategory;
use lumen_host::{Host, ImmediateHandle, TimerHandle};
use lumen_project::ProjectService;

use crate::protocol::Event;

/// Receives events as scheduler work executes.
pub type EventSink = Arc<dyn Fn(Event) + Send + Sync>;

const CATEGORY_ORDER: [CheckCategory; 3] = [
    CheckCategory::Syntax,
    CheckCategory::Semantic,
    CheckCategory::Suggestion,
];

#[derive(Default)]
struct SchedulerState {
    generation: u64,
    timer: Option<TimerHandle>,
    immediate: Option<ImmediateHandle>,
}

pub struct GeterrScheduler {
    host: Arc<dyn Host>,
    service: Arc<ProjectService>,
    sink: EventSink,
    state: Mutex<SchedulerState>,
    weak: Weak<GeterrScheduler>,
}

impl GeterrScheduler {
    pub fn new(host: Arc<dyn Host>, service: Arc<ProjectService>, sink: EventSink) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            host,
            service,
            sink,
            state: Mutex::new(SchedulerState::default()),
            weak: weak.clone(),
        })
    }

    /// Enqueue a request, cancelling any request still in flight. An empty
    /// file list completes immediately with zero category events.
    pub fn request(&self, seq: u64, files: Vec<String>, delay: Duration) {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            if let Some(handle) = state.timer.take() {
                self.host.clear_timeout(handle);
            }
            if let Some(handle) = state.immediate.take() {
                self.host.clear_immediate(handle);
            }
            state.generation
        };
        tracing::debug!(
            target = "lumen.session",
            seq,
            files = files.len(),
            "geterr queued"
        );

        if files.is_empty() {
            (self.sink)(Event::request_completed(seq));
            return;
        }

        let steps: Arc<Vec<(String, CheckCategory)>> = Arc::new(
            files
                .into_iter()
                .flat_map(|file| {
                    CATEGORY_ORDER
                        .into_iter()
                        .map(move |category| (file.clone(), category))
                })
                .collect(),
        );

        let weak = self.weak.clone();
        let handle = self.host.schedule_timeout(
            delay,
            Box::new(move || {
                if let Some(scheduler) = weak.upgrade() {
                    scheduler.run_step(generation, seq, steps, 0);
                }
            }),
        );
        let mut state = self.state.lock();
        if state.generation == generation {
            state.timer = Some(handle);
        } else {
            self.host.clear_timeout(handle);
        }
    }

    /// Run one (file, category) step, emit its event, and arm the next
    /// step on the immediate queue; past the last step, emit completion.
    fn run_step(
        &self,
        generation: u64,
        seq: u64,
        steps: Arc<Vec<(String, CheckCategory)>>,
        index: usize,
    ) {
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.timer = None;
            state.immediate = None;
        }

        let Some((file, category)) = steps.get(index) else {
            tracing::debug!(target = "lumen.session", seq, "geterr completed");
            (self.sink)(Event::request_completed(seq));
            return;
        };

        // A file with no containing project emits nothing for this
        // category; the sequence still advances through its yield.
        if let Some(diagnostics) = self.service.compute_diagnostics(file, *category) {
            (self.sink)(Event::diagnostics(*category, file.clone(), diagnostics));
        }

        let weak = self.weak.clone();
        let next_steps = Arc::clone(&steps);
        let handle = self.host.schedule_immediate(Box::new(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.run_step(generation, seq, next_steps, index + 1);
            }
        }));
        let mut state = self.state.lock();
        if state.generation == generation {
            state.immediate = Some(handle);
        } else {
            self.host.clear_immediate(handle);
        }
    }
}
