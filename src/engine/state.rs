//! Engine phases, trial stages, outward events and the display snapshot

use crate::config::ConfigError;
use crate::tasks::{TaskResult, Trial};
use thiserror::Error;

/// Errors raised while setting up a task run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid task configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Top-level lifecycle of one task run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Waiting for the start signal
    Instructions,
    /// 3..1 countdown
    Countdown,
    /// Running trials
    Test,
    /// Terminal: result computed
    Results,
    /// Terminal: torn down before completion
    Aborted,
}

impl EnginePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Results | Self::Aborted)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Instructions => "instructions",
            Self::Countdown => "countdown",
            Self::Test => "test",
            Self::Results => "results",
            Self::Aborted => "aborted",
        }
    }
}

/// Where the current trial is within its protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStage {
    Idle,
    /// Foreperiod before a reactive stimulus (PVT)
    PreStimulus,
    /// Stimulus shown, response window open
    Stimulus,
    Feedback,
    InterTrial,
}

/// Something the host may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PhaseChanged(EnginePhase),
    CountdownTick(u8),
    TrialStarted {
        index: usize,
    },
    StimulusOnset {
        index: usize,
    },
    ResponseRecorded {
        index: usize,
        correct: bool,
        response_time: f64,
        before_onset: bool,
    },
    /// The response window closed without input. `recorded` says whether a
    /// timeout response was appended.
    TimedOut {
        index: usize,
        recorded: bool,
    },
    TrialFinished {
        index: usize,
    },
    Completed(TaskResult),
}

/// What a front-end should draw right now
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState<'a> {
    Instructions,
    Countdown(u8),
    /// Between trials or before the first one
    Blank,
    /// Foreperiod running; `elapsed_ms` since it began
    Waiting { elapsed_ms: f64 },
    Stimulus { trial: &'a Trial, elapsed_ms: f64 },
    Feedback { correct: bool },
    Done,
    Aborted,
}
