//! Cognitive Battery - timed-trial engine for four attention and memory tasks
//!
//! The library holds everything but the terminal loop: trial sequencing and
//! scoring ([`tasks`]), the per-task state machine ([`engine`]), the
//! four-task session ([`session`]), result sinks ([`persist`]), reports and
//! configuration. The `cognitive-battery` binary drives it from a ratatui UI.

pub mod config;
pub mod engine;
pub mod input;
pub mod persist;
pub mod report;
pub mod session;
pub mod tasks;
pub mod timing;
pub mod ui;
pub mod utils;

pub use config::Config;
