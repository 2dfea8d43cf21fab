//! Health verdict derivation.
//!
//! The verdict is a pure function of a [`Snapshot`] and the current time,
//! recomputed on every query. It is deliberately conservative: `Up` means
//! the last attempt actually succeeded recently, not merely that the
//! process is alive.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::state::Snapshot;

/// The up/down verdict a supervisor acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Up,
    Down,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Up => write!(f, "up"),
            Verdict::Down => write!(f, "down"),
        }
    }
}

/// Derive the verdict from a state snapshot.
///
/// Rules, in order:
/// 1. `Down` until a first attempt has both started and ended.
/// 2. `Down` while any trailing failures are recorded.
/// 3. `Down` when an in-flight attempt has exceeded `max_expected_duration`.
/// 4. `Up` otherwise.
///
/// `now` is passed in rather than read from the clock so the overrun rule
/// is testable at exact instants.
pub fn derive_verdict(
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    max_expected_duration: Duration,
) -> Verdict {
    let Some(last_start) = snapshot.last_start else {
        return Verdict::Down;
    };
    if snapshot.last_end.is_none() {
        return Verdict::Down;
    }
    if snapshot.consecutive_errors > 0 {
        return Verdict::Down;
    }
    if snapshot.in_flight() && overran(last_start, now, max_expected_duration) {
        return Verdict::Down;
    }
    Verdict::Up
}

fn overran(last_start: DateTime<Utc>, now: DateTime<Utc>, max: Duration) -> bool {
    let max = chrono::Duration::from_std(max).unwrap_or(chrono::Duration::MAX);
    now - last_start > max
}
