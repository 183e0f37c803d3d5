//! Task logic for the four battery tasks
//!
//! Each task is a set of three pure functions behind [`TaskLogic`]: build
//! the trial sequence, judge one response, and score a finished run. The
//! closed [`Task`] enum picks an implementation from a [`TestType`].

mod flanker;
mod model;
mod nback;
mod pvt;
mod sart;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use flanker::{FlankerLogic, FlankerMetrics};
pub use model::{
    FlankerTrial, FlankerType, NBackTrial, PvtTrial, Response, SartTrial, TaskMetrics,
    TaskResult, TestType, Trial,
};
pub use nback::{NBackLogic, NBackMetrics};
pub use pvt::{PvtLogic, PvtMetrics};
pub use sart::{SartLogic, SartMetrics};

use crate::config::TestConfig;
use crate::input::InputEvent;
use rand::RngCore;

/// Common trait for all battery tasks
pub trait TaskLogic {
    /// Which task this logic scores
    fn test_type(&self) -> TestType;

    /// Build the full trial sequence; its length equals `config.total_trials`
    fn generate_sequence(&self, config: &TestConfig, rng: &mut dyn RngCore) -> Vec<Trial>;

    /// Judge a single input (or synthesized timeout) against its trial
    fn validate_response(&self, trial: &Trial, input: &InputEvent) -> bool;

    /// Score a finished run.
    ///
    /// Pure: the same inputs always give the same result. Timing fields are
    /// left at zero for the caller to stamp.
    fn calculate_results(
        &self,
        responses: &[Response],
        config: &TestConfig,
        sequence: &[Trial],
    ) -> TaskResult;
}

/// Closed set of task implementations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Task {
    Sart(SartLogic),
    Flanker(FlankerLogic),
    NBack(NBackLogic),
    Pvt(PvtLogic),
}

impl Task {
    /// Default logic for a task type
    pub fn for_type(test_type: TestType) -> Self {
        match test_type {
            TestType::Sart => Self::Sart(SartLogic::default()),
            TestType::Flanker => Self::Flanker(FlankerLogic),
            TestType::NBack => Self::NBack(NBackLogic::default()),
            TestType::Pvt => Self::Pvt(PvtLogic::default()),
        }
    }

    fn logic(&self) -> &dyn TaskLogic {
        match self {
            Self::Sart(logic) => logic,
            Self::Flanker(logic) => logic,
            Self::NBack(logic) => logic,
            Self::Pvt(logic) => logic,
        }
    }
}

impl TaskLogic for Task {
    fn test_type(&self) -> TestType {
        self.logic().test_type()
    }

    fn generate_sequence(&self, config: &TestConfig, rng: &mut dyn RngCore) -> Vec<Trial> {
        self.logic().generate_sequence(config, rng)
    }

    fn validate_response(&self, trial: &Trial, input: &InputEvent) -> bool {
        self.logic().validate_response(trial, input)
    }

    fn calculate_results(
        &self,
        responses: &[Response],
        config: &TestConfig,
        sequence: &[Trial],
    ) -> TaskResult {
        self.logic().calculate_results(responses, config, sequence)
    }
}

/// A single labelled metric for display and reports
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    pub label: String,
    pub value: String,
    pub status: MetricStatus,
}

impl MetricLine {
    pub fn new(label: impl Into<String>, value: impl Into<String>, status: MetricStatus) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            status,
        }
    }

    pub fn ok(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, value, MetricStatus::Ok)
    }

    pub fn warning(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, value, MetricStatus::Warning)
    }

    pub fn error(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, value, MetricStatus::Error)
    }

    pub fn info(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, value, MetricStatus::Info)
    }
}

/// Status of a metric line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricStatus {
    Ok,
    Warning,
    Error,
    Info,
}

impl MetricStatus {
    /// Grade a [0,1] proportion against good/fair thresholds
    pub fn grade(value: f64, good: f64, fair: f64) -> Self {
        if value >= good {
            Self::Ok
        } else if value >= fair {
            Self::Warning
        } else {
            Self::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}
