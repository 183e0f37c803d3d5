//! Time sources

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A source of monotonic milliseconds plus the matching wall-clock time.
pub trait Clock {
    /// Milliseconds since the clock was created. Never goes backwards.
    fn now_ms(&self) -> f64;

    /// Wall-clock epoch milliseconds for "now".
    fn epoch_ms(&self) -> i64;

    /// Converts a monotonic reading taken earlier into epoch milliseconds.
    fn epoch_at(&self, monotonic_ms: f64) -> i64 {
        let behind = (self.now_ms() - monotonic_ms).max(0.0);
        self.epoch_ms() - behind.round() as i64
    }
}

/// Real clock backed by [`Instant`], anchored to UTC at creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
    start_epoch_ms: i64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_epoch_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    fn epoch_ms(&self) -> i64 {
        self.start_epoch_ms + self.start.elapsed().as_millis() as i64
    }
}

/// Hand-driven clock for tests and replays.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// advance it while the engine owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
    epoch_base_ms: i64,
}

impl ManualClock {
    /// Epoch used when none is given: 2024-01-01T00:00:00Z
    pub const DEFAULT_EPOCH_MS: i64 = 1_704_067_200_000;

    pub fn new() -> Self {
        Self::starting_at(Self::DEFAULT_EPOCH_MS)
    }

    pub fn starting_at(epoch_base_ms: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(0.0)),
            epoch_base_ms,
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms.max(0.0));
    }

    /// Moves to an absolute reading. Earlier readings are ignored.
    pub fn set(&self, ms: f64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }

    fn epoch_ms(&self) -> i64 {
        self.epoch_base_ms + self.now.get().round() as i64
    }
}
