//! Aggregate score and ability profile for a finished session

use crate::tasks::{TaskResult, TestType};
use serde::{Deserialize, Serialize};

/// Reaction times at or below this score full speed marks
pub const RT_FLOOR_MS: f64 = 200.0;
/// Reaction times at or above this score zero speed marks
pub const RT_CEILING_MS: f64 = 1000.0;

/// Map a mean reaction time onto [0, 1], faster is higher
pub fn normalize_reaction_time(rt_ms: f64) -> f64 {
    let clamped = rt_ms.clamp(RT_FLOOR_MS, RT_CEILING_MS);
    (1.0 - (clamped - RT_FLOOR_MS) / (RT_CEILING_MS - RT_FLOOR_MS)).clamp(0.0, 1.0)
}

/// One accuracy value per ability, each taken from the task that measures it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityProfile {
    pub sustained_attention: f64,
    pub selective_attention: f64,
    pub working_memory: f64,
    pub vigilance: f64,
}

impl AbilityProfile {
    pub fn from_results(results: &[TaskResult]) -> Self {
        let accuracy = |test_type: TestType| {
            results
                .iter()
                .find(|r| r.test_type() == test_type)
                .map_or(0.0, |r| r.accuracy)
        };
        Self {
            sustained_attention: accuracy(TestType::Sart),
            selective_attention: accuracy(TestType::Flanker),
            working_memory: accuracy(TestType::NBack),
            vigilance: accuracy(TestType::Pvt),
        }
    }

    /// `(ability label, value)` in task order
    pub fn axes(&self) -> [(&'static str, f64); 4] {
        [
            (TestType::Sart.ability(), self.sustained_attention),
            (TestType::Flanker.ability(), self.selective_attention),
            (TestType::NBack.ability(), self.working_memory),
            (TestType::Pvt.ability(), self.vigilance),
        ]
    }
}

/// Session-level numbers shown after the last task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// 0-100
    pub score: u8,
    pub mean_accuracy: f64,
    /// Mean of per-task average RTs, ignoring tasks with none
    pub mean_reaction_time: f64,
    pub speed_score: f64,
    pub profile: AbilityProfile,
}

impl SessionSummary {
    pub fn from_results(results: &[TaskResult]) -> Self {
        let mean_accuracy = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.accuracy).sum::<f64>() / results.len() as f64
        };

        let timed: Vec<f64> = results
            .iter()
            .map(|r| r.average_reaction_time)
            .filter(|&rt| rt > 0.0)
            .collect();
        let (mean_reaction_time, speed_score) = if timed.is_empty() {
            (0.0, 0.0)
        } else {
            let rt = timed.iter().sum::<f64>() / timed.len() as f64;
            (rt, normalize_reaction_time(rt))
        };

        let score = ((mean_accuracy + speed_score) / 2.0 * 100.0)
            .round()
            .clamp(0.0, 100.0) as u8;

        Self {
            score,
            mean_accuracy,
            mean_reaction_time,
            speed_score,
            profile: AbilityProfile::from_results(results),
        }
    }
}
