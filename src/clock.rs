//! Timestamp sources.
//!
//! The graph never invents timestamps for its operations; callers supply one
//! per mutation. A `Clock` is only consulted by the add skew guard (see
//! `SkewGuard`), which raises a stale add timestamp up to the replica's
//! current time.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering::SeqCst};

use chrono::Utc;

use crate::Timestamp;

/// A source of the current time, in the same units as operation timestamps.
pub trait Clock : Debug + Send + Sync {

    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// A wall clock reporting microseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Clocks set before the epoch report zero.
        u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Useful for hosts driving the graph with a logical clock, and for tests.
///
/// ### Example
///
/// ```
/// use crdt_graph::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(10);
/// clock.advance(5);
/// assert_eq!(15, clock.now());
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {

    /// Creates a clock reading `now`.
    pub fn new(now: Timestamp) -> ManualClock {
        ManualClock { now: AtomicU64::new(now) }
    }

    /// Sets the clock to `now`.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, SeqCst);
    }

    /// Moves the clock forward by `delta`, saturating at `u64::MAX`.
    pub fn advance(&self, delta: Timestamp) {
        let _ = self.now.fetch_update(SeqCst, SeqCst, |now| Some(now.saturating_add(delta)));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(SeqCst)
    }
}
