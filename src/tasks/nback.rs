//! N-back working-memory task (2-back by default)

use super::stats::{d_prime, mean, ratio};
use super::{
    MetricLine, MetricStatus, NBackTrial, Response, TaskLogic, TaskMetrics, TaskResult,
    TestType, Trial,
};
use crate::config::TestConfig;
use crate::input::InputEvent;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

const DEFAULT_ALPHABET: &[char] = &['A', 'B', 'C', 'D', 'E', 'F'];

/// Letter stream where the participant responds when the current letter
/// matches the one `n` positions back
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NBackLogic {
    pub n: usize,
    pub target_probability: f64,
    pub alphabet: &'static [char],
}

impl Default for NBackLogic {
    fn default() -> Self {
        Self {
            n: 2,
            target_probability: 0.25,
            alphabet: DEFAULT_ALPHABET,
        }
    }
}

impl NBackLogic {
    fn random_letter(&self, rng: &mut dyn RngCore) -> char {
        self.alphabet[rng.random_range(0..self.alphabet.len())]
    }

    /// Any letter except `avoid`
    fn letter_other_than(&self, avoid: char, rng: &mut dyn RngCore) -> char {
        let others: Vec<char> = self.alphabet.iter().copied().filter(|&c| c != avoid).collect();
        if others.is_empty() {
            return avoid;
        }
        others[rng.random_range(0..others.len())]
    }
}

/// Signal-detection counts for an N-back run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NBackMetrics {
    pub hits: u32,
    pub false_positives: u32,
    pub misses: u32,
    pub correct_rejections: u32,
    pub hit_rate: f64,
    pub false_alarm_rate: f64,
    pub d_prime: f64,
}

impl NBackMetrics {
    pub fn summary_lines(&self) -> Vec<MetricLine> {
        vec![
            MetricLine::new(
                "Hits",
                format!("{}/{}", self.hits, self.hits + self.misses),
                MetricStatus::grade(self.hit_rate, 0.8, 0.5),
            ),
            MetricLine::new(
                "False Alarms",
                self.false_positives.to_string(),
                MetricStatus::grade(1.0 - self.false_alarm_rate, 0.9, 0.7),
            ),
            MetricLine::info("Correct Rejections", self.correct_rejections.to_string()),
            MetricLine::info("d'", format!("{:.2}", self.d_prime)),
        ]
    }
}

impl TaskLogic for NBackLogic {
    fn test_type(&self) -> TestType {
        TestType::NBack
    }

    fn generate_sequence(&self, config: &TestConfig, rng: &mut dyn RngCore) -> Vec<Trial> {
        let mut letters: Vec<char> = Vec::with_capacity(config.total_trials);
        let mut sequence = Vec::with_capacity(config.total_trials);

        for position in 0..config.total_trials {
            let (letter, is_target) = if position < self.n {
                (self.random_letter(rng), false)
            } else {
                let back = letters[position - self.n];
                if rng.random_bool(self.target_probability) {
                    (back, true)
                } else {
                    (self.letter_other_than(back, rng), false)
                }
            };
            letters.push(letter);
            sequence.push(Trial::NBack(NBackTrial {
                letter,
                is_target,
                position,
            }));
        }

        sequence
    }

    fn validate_response(&self, trial: &Trial, input: &InputEvent) -> bool {
        match trial.as_nback() {
            Some(t) => t.is_target == input.has_response,
            None => false,
        }
    }

    fn calculate_results(
        &self,
        responses: &[Response],
        _config: &TestConfig,
        sequence: &[Trial],
    ) -> TaskResult {
        let mut hits = 0usize;
        let mut misses = 0usize;
        let mut false_positives = 0usize;
        let mut correct_rejections = 0usize;
        let mut hit_rts = Vec::new();

        for trial in sequence.iter().filter_map(Trial::as_nback) {
            let answer = responses.iter().find(|r| {
                r.responded
                    && r.stimulus
                        .as_nback()
                        .is_some_and(|s| s.position == trial.position && s.letter == trial.letter)
            });

            match (trial.is_target, answer) {
                (true, Some(r)) => {
                    hits += 1;
                    hit_rts.push(r.response_time);
                }
                (true, None) => misses += 1,
                (false, Some(_)) => false_positives += 1,
                (false, None) => correct_rejections += 1,
            }
        }

        let targets = hits + misses;
        let non_targets = false_positives + correct_rejections;

        let metrics = NBackMetrics {
            hits: hits as u32,
            false_positives: false_positives as u32,
            misses: misses as u32,
            correct_rejections: correct_rejections as u32,
            hit_rate: ratio(hits, targets),
            false_alarm_rate: ratio(false_positives, non_targets),
            d_prime: d_prime(hits, targets, false_positives, non_targets),
        };

        TaskResult::new(
            ratio(hits + correct_rejections, sequence.len()),
            mean(&hit_rts),
            responses,
            TaskMetrics::NBack(metrics),
        )
    }
}
