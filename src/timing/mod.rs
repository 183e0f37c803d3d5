//! Clocks and the cooperative timer scheduler that drive trial presentation
//!
//! Nothing here sleeps or spawns threads. The host calls `tick()` on the
//! engine at its own frame rate and the engine asks its [`Scheduler`] which
//! timers have come due, so timing resolution is whatever the host loop
//! provides.

mod clock;
mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use scheduler::{Scheduler, TimerHandle, TimerKind};
