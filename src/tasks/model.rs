//! Trials, responses and task results

use super::{FlankerMetrics, MetricLine, NBackMetrics, PvtMetrics, SartMetrics};
use crate::input::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four battery tasks, in administration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Sart,
    Flanker,
    NBack,
    Pvt,
}

impl TestType {
    /// Fixed order of a sequential session
    pub const ORDER: [TestType; 4] = [Self::Sart, Self::Flanker, Self::NBack, Self::Pvt];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sart => "SART",
            Self::Flanker => "Flanker",
            Self::NBack => "2-Back",
            Self::Pvt => "PVT",
        }
    }

    /// Wire identifier used in serialized results
    pub fn id(&self) -> &'static str {
        match self {
            Self::Sart => "sart",
            Self::Flanker => "flanker",
            Self::NBack => "nback",
            Self::Pvt => "pvt",
        }
    }

    /// Ability axis this task feeds in the session profile
    pub fn ability(&self) -> &'static str {
        match self {
            Self::Sart => "Sustained attention",
            Self::Flanker => "Selective attention",
            Self::NBack => "Working memory",
            Self::Pvt => "Vigilance",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Sart => 0,
            Self::Flanker => 1,
            Self::NBack => 2,
            Self::Pvt => 3,
        }
    }

    /// The task that follows this one in a session
    pub fn next(&self) -> Option<TestType> {
        Self::ORDER.get(self.index() + 1).copied()
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Go/no-go digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SartTrial {
    pub number: u8,
    pub is_no_go: bool,
}

/// Flanker trial kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlankerType {
    Congruent,
    Incongruent,
}

/// Row of five arrows; the target is the centre one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlankerTrial {
    pub arrows: String,
    pub target_direction: Direction,
    #[serde(rename = "type")]
    pub kind: FlankerType,
}

impl FlankerTrial {
    pub fn new(target: Direction, kind: FlankerType) -> Self {
        let flank = match kind {
            FlankerType::Congruent => target,
            FlankerType::Incongruent => target.opposite(),
        };
        let arrows = [flank, flank, target, flank, flank]
            .iter()
            .map(|d| d.arrow())
            .collect();
        Self {
            arrows,
            target_direction: target,
            kind,
        }
    }
}

/// Letter in an N-back stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NBackTrial {
    pub letter: char,
    pub is_target: bool,
    pub position: usize,
}

/// One wait-then-react vigilance cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvtTrial {
    pub trial_number: usize,
    pub wait_time: u64,
}

/// A single trial of any task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Trial {
    Sart(SartTrial),
    Flanker(FlankerTrial),
    NBack(NBackTrial),
    Pvt(PvtTrial),
}

impl Trial {
    pub fn test_type(&self) -> TestType {
        match self {
            Self::Sart(_) => TestType::Sart,
            Self::Flanker(_) => TestType::Flanker,
            Self::NBack(_) => TestType::NBack,
            Self::Pvt(_) => TestType::Pvt,
        }
    }

    pub fn as_sart(&self) -> Option<&SartTrial> {
        match self {
            Self::Sart(trial) => Some(trial),
            _ => None,
        }
    }

    pub fn as_flanker(&self) -> Option<&FlankerTrial> {
        match self {
            Self::Flanker(trial) => Some(trial),
            _ => None,
        }
    }

    pub fn as_nback(&self) -> Option<&NBackTrial> {
        match self {
            Self::NBack(trial) => Some(trial),
            _ => None,
        }
    }

    pub fn as_pvt(&self) -> Option<&PvtTrial> {
        match self {
            Self::Pvt(trial) => Some(trial),
            _ => None,
        }
    }

    /// Wait before the stimulus appears, for trials that have one
    pub fn pre_stimulus_wait_ms(&self) -> Option<u64> {
        self.as_pvt().map(|t| t.wait_time)
    }

    /// Short text form for display
    pub fn label(&self) -> String {
        match self {
            Self::Sart(t) => t.number.to_string(),
            Self::Flanker(t) => t.arrows.clone(),
            Self::NBack(t) => t.letter.to_string(),
            Self::Pvt(t) => format!("#{}", t.trial_number),
        }
    }
}

impl From<SartTrial> for Trial {
    fn from(trial: SartTrial) -> Self {
        Self::Sart(trial)
    }
}

impl From<FlankerTrial> for Trial {
    fn from(trial: FlankerTrial) -> Self {
        Self::Flanker(trial)
    }
}

impl From<NBackTrial> for Trial {
    fn from(trial: NBackTrial) -> Self {
        Self::NBack(trial)
    }
}

impl From<PvtTrial> for Trial {
    fn from(trial: PvtTrial) -> Self {
        Self::Pvt(trial)
    }
}

fn default_true() -> bool {
    true
}

/// Outcome of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// The trial this response answers
    pub stimulus: Trial,
    /// Milliseconds from stimulus onset (or from wait start for false starts)
    pub response_time: f64,
    pub correct: bool,
    /// Epoch milliseconds of the input
    pub timestamp: i64,
    /// False for records synthesized when the window closed without input
    #[serde(default = "default_true")]
    pub responded: bool,
}

impl Response {
    /// Responded, positive reaction time strictly inside `(min, max)`
    pub fn is_valid_rt(&self, min_ms: f64, max_ms: f64) -> bool {
        self.responded && self.response_time > min_ms && self.response_time < max_ms
    }
}

/// Task-specific result fields, tagged by `testType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "testType", rename_all = "lowercase")]
pub enum TaskMetrics {
    Sart(SartMetrics),
    Flanker(FlankerMetrics),
    NBack(NBackMetrics),
    Pvt(PvtMetrics),
}

impl TaskMetrics {
    pub fn test_type(&self) -> TestType {
        match self {
            Self::Sart(_) => TestType::Sart,
            Self::Flanker(_) => TestType::Flanker,
            Self::NBack(_) => TestType::NBack,
            Self::Pvt(_) => TestType::Pvt,
        }
    }
}

/// Scored outcome of one task run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    /// Epoch milliseconds when the first trial started
    pub start_time: i64,
    /// Epoch milliseconds when the last trial ended
    pub end_time: i64,
    pub duration: i64,
    /// Proportion correct in [0, 1]
    pub accuracy: f64,
    pub average_reaction_time: f64,
    pub responses: Vec<Response>,
    #[serde(flatten)]
    pub metrics: TaskMetrics,
}

impl TaskResult {
    pub fn new(
        accuracy: f64,
        average_reaction_time: f64,
        responses: &[Response],
        metrics: TaskMetrics,
    ) -> Self {
        Self {
            start_time: 0,
            end_time: 0,
            duration: 0,
            accuracy: accuracy.clamp(0.0, 1.0),
            average_reaction_time,
            responses: responses.to_vec(),
            metrics,
        }
    }

    pub fn test_type(&self) -> TestType {
        self.metrics.test_type()
    }

    /// Attach the run window
    pub fn stamped(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self.duration = (end_time - start_time).max(0);
        self
    }

    /// Labelled metrics for display and reports
    pub fn summary_lines(&self) -> Vec<MetricLine> {
        let mut lines = vec![
            MetricLine::new(
                "Accuracy",
                format!("{:.1}%", self.accuracy * 100.0),
                super::MetricStatus::grade(self.accuracy, 0.9, 0.7),
            ),
            MetricLine::info(
                "Avg Reaction Time",
                format!("{:.0} ms", self.average_reaction_time),
            ),
        ];
        match &self.metrics {
            TaskMetrics::Sart(m) => lines.extend(m.summary_lines()),
            TaskMetrics::Flanker(m) => lines.extend(m.summary_lines()),
            TaskMetrics::NBack(m) => lines.extend(m.summary_lines()),
            TaskMetrics::Pvt(m) => lines.extend(m.summary_lines()),
        }
        lines.push(MetricLine::info(
            "Duration",
            format!("{:.1}s", self.duration as f64 / 1000.0),
        ));
        lines
    }
}
