//! Cancellable one-shot timers

use log::trace;

/// Opaque handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// What a timer is for. The owner decides what firing means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// One step of the 3..1 countdown
    Countdown,
    /// Random wait before a reactive stimulus appears
    PreStimulus,
    /// End of the response window
    Stimulus,
    /// End of the feedback flash
    Feedback,
    /// Blank gap between trials
    InterTrial,
    /// "Next up" pause between tasks of a session
    Transition,
}

#[derive(Debug, Clone)]
struct PendingTimer {
    handle: TimerHandle,
    kind: TimerKind,
    due_ms: f64,
}

/// Single-threaded timer queue.
///
/// Every handle it gives out stays trackable until it fires or is
/// cancelled, which is what lets an owner tear down deterministically.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    pending: Vec<PendingTimer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer `delay_ms` after `now_ms`
    pub fn schedule(&mut self, kind: TimerKind, now_ms: f64, delay_ms: u64) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        let due_ms = now_ms + delay_ms as f64;
        trace!("timer {:?} ({:?}) due at {:.1} ms", handle, kind, due_ms);
        self.pending.push(PendingTimer {
            handle,
            kind,
            due_ms,
        });
        handle
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    /// Cancel everything. Returns how many timers were still pending.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest due time among pending timers
    pub fn next_deadline(&self) -> Option<f64> {
        self.pending
            .iter()
            .map(|t| t.due_ms)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Remove and return the earliest timer that is due at `now_ms`, with
    /// the time it was due.
    ///
    /// Ties fire in scheduling order. Call in a loop: firing one timer may
    /// schedule or cancel others.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(TimerHandle, TimerKind, f64)> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .partial_cmp(&b.due_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.handle.0.cmp(&b.handle.0))
            })
            .map(|(i, _)| i)?;
        let timer = self.pending.remove(index);
        Some((timer.handle, timer.kind, timer.due_ms))
    }
}
