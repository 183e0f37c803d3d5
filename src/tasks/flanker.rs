//! Eriksen flanker conflict task

use super::stats::{mean, ratio};
use super::{
    FlankerTrial, FlankerType, MetricLine, MetricStatus, Response, TaskLogic, TaskMetrics,
    TaskResult, TestType, Trial,
};
use crate::config::TestConfig;
use crate::input::{Direction, InputEvent};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Arrow-row conflict task
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlankerLogic;

/// Flanker-specific result fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlankerMetrics {
    /// Mean RT of correct congruent responses
    #[serde(rename = "congruentRT")]
    pub congruent_rt: f64,
    /// Mean RT of correct incongruent responses
    #[serde(rename = "incongruentRT")]
    pub incongruent_rt: f64,
    /// Incongruent minus congruent RT. Negative values are reported as-is.
    pub interference_effect: f64,
    pub congruent_accuracy: f64,
    pub incongruent_accuracy: f64,
}

impl FlankerMetrics {
    pub fn summary_lines(&self) -> Vec<MetricLine> {
        vec![
            MetricLine::info("Congruent RT", format!("{:.0} ms", self.congruent_rt)),
            MetricLine::info("Incongruent RT", format!("{:.0} ms", self.incongruent_rt)),
            MetricLine::new(
                "Interference",
                format!("{:+.0} ms", self.interference_effect),
                if self.interference_effect < 0.0 {
                    MetricStatus::Warning
                } else {
                    MetricStatus::Info
                },
            ),
            MetricLine::info(
                "Congruent Acc",
                format!("{:.1}%", self.congruent_accuracy * 100.0),
            ),
            MetricLine::info(
                "Incongruent Acc",
                format!("{:.1}%", self.incongruent_accuracy * 100.0),
            ),
        ]
    }
}

impl TaskLogic for FlankerLogic {
    fn test_type(&self) -> TestType {
        TestType::Flanker
    }

    fn generate_sequence(&self, config: &TestConfig, rng: &mut dyn RngCore) -> Vec<Trial> {
        let total = config.total_trials;
        let congruent = total / 2;

        let mut sequence: Vec<Trial> = (0..total)
            .map(|i| {
                let (kind, k) = if i < congruent {
                    (FlankerType::Congruent, i)
                } else {
                    (FlankerType::Incongruent, i - congruent)
                };
                let target = if k % 2 == 0 {
                    Direction::Left
                } else {
                    Direction::Right
                };
                Trial::Flanker(FlankerTrial::new(target, kind))
            })
            .collect();

        sequence.shuffle(rng);
        sequence
    }

    fn validate_response(&self, trial: &Trial, input: &InputEvent) -> bool {
        match trial.as_flanker() {
            Some(t) => input.has_response && input.direction() == Some(t.target_direction),
            None => false,
        }
    }

    fn calculate_results(
        &self,
        responses: &[Response],
        _config: &TestConfig,
        sequence: &[Trial],
    ) -> TaskResult {
        let trials_of = |kind: FlankerType| {
            sequence
                .iter()
                .filter_map(Trial::as_flanker)
                .filter(|t| t.kind == kind)
                .count()
        };
        let correct_of = |kind: FlankerType| {
            responses
                .iter()
                .filter(|r| r.correct && r.responded)
                .filter(|r| r.stimulus.as_flanker().is_some_and(|t| t.kind == kind))
                .collect::<Vec<_>>()
        };

        let congruent = correct_of(FlankerType::Congruent);
        let incongruent = correct_of(FlankerType::Incongruent);
        let rts = |rs: &[&Response]| rs.iter().map(|r| r.response_time).collect::<Vec<_>>();
        let congruent_rts = rts(&congruent);
        let incongruent_rts = rts(&incongruent);

        let congruent_rt = mean(&congruent_rts);
        let incongruent_rt = mean(&incongruent_rts);

        let correct = responses.iter().filter(|r| r.correct).count();
        let all_rts: Vec<f64> = congruent_rts
            .iter()
            .chain(incongruent_rts.iter())
            .copied()
            .collect();

        let metrics = FlankerMetrics {
            congruent_rt,
            incongruent_rt,
            interference_effect: incongruent_rt - congruent_rt,
            congruent_accuracy: ratio(congruent.len(), trials_of(FlankerType::Congruent)),
            incongruent_accuracy: ratio(incongruent.len(), trials_of(FlankerType::Incongruent)),
        };

        TaskResult::new(
            ratio(correct, sequence.len()),
            mean(&all_rts),
            responses,
            TaskMetrics::Flanker(metrics),
        )
    }
}
