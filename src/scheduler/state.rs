//! Shared run-timing state for the scheduler loop.
//!
//! `RunState` is the single record of what the loop has done so far: when
//! the last attempt started and ended, how many consecutive attempts have
//! failed, and whether the loop is still running. The loop is the only
//! writer; API handlers read it through [`StateHandle::snapshot`], which
//! copies all four fields under one short lock so a reader never sees a
//! `last_start` paired with a stale `last_end` from a different attempt.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Timing and failure history of the periodic task.
#[derive(Debug, Default, Clone)]
pub struct RunState {
    /// Wall-clock time the most recent attempt began.
    pub last_start: Option<DateTime<Utc>>,
    /// Wall-clock time the most recent attempt finished (success or failure).
    pub last_end: Option<DateTime<Utc>>,
    /// Failed attempts since the last success; 0 after any success.
    pub consecutive_errors: u32,
    /// True from loop start until shutdown completes.
    pub running: bool,
}

/// A consistent copy of [`RunState`], taken under the lock.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Snapshot {
    pub last_start: Option<DateTime<Utc>>,
    pub last_end: Option<DateTime<Utc>>,
    pub consecutive_errors: u32,
    pub running: bool,
}

impl Snapshot {
    /// An attempt is in flight when a start has been recorded that no end
    /// matches yet. Observers use this to spot stuck tasks.
    pub fn in_flight(&self) -> bool {
        match (self.last_start, self.last_end) {
            (Some(start), Some(end)) => end < start,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// Cloneable handle to the shared [`RunState`].
///
/// The scheduler loop holds one clone and mutates through it; the API layer
/// holds another and only ever calls [`snapshot`](Self::snapshot). No method
/// here blocks on anything but the mutex, and the mutex is never held across
/// an executor invocation or a sleep.
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    inner: Arc<Mutex<RunState>>,
}

impl StateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.lock().expect("run state mutex poisoned");
        Snapshot {
            last_start: state.last_start,
            last_end: state.last_end,
            consecutive_errors: state.consecutive_errors,
            running: state.running,
        }
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.inner.lock().expect("run state mutex poisoned").running = running;
    }

    pub(crate) fn record_start(&self, at: DateTime<Utc>) {
        self.inner.lock().expect("run state mutex poisoned").last_start = Some(at);
    }

    /// Record the end of an attempt and fold its outcome into the error
    /// counter. One critical section so the end timestamp and the counter
    /// move together.
    pub(crate) fn record_end(&self, at: DateTime<Utc>, success: bool) {
        let mut state = self.inner.lock().expect("run state mutex poisoned");
        state.last_end = Some(at);
        if success {
            state.consecutive_errors = 0;
        } else {
            state.consecutive_errors = state.consecutive_errors.saturating_add(1);
        }
    }
}
