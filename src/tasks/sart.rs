//! Sustained Attention to Response Task (go/no-go on digits)

use super::stats::{mean, ratio, sample_std_dev};
use super::{MetricLine, MetricStatus, Response, SartTrial, TaskLogic, TaskMetrics, TaskResult, TestType, Trial};
use crate::config::TestConfig;
use crate::input::InputEvent;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Reaction times at or below this are anticipations, not responses
const MIN_VALID_RT_MS: f64 = 100.0;

/// Go/no-go digit task
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SartLogic {
    /// Digit the participant must withhold on
    pub no_go_digit: u8,
    /// Chance that any given trial is the no-go digit
    pub no_go_probability: f64,
}

impl Default for SartLogic {
    fn default() -> Self {
        Self {
            no_go_digit: 3,
            no_go_probability: 0.2,
        }
    }
}

impl SartLogic {
    fn go_digit(&self, rng: &mut dyn RngCore) -> u8 {
        // Uniform over the nine digits that are not the no-go digit
        let pick = rng.random_range(0..9u8);
        if pick >= self.no_go_digit {
            pick + 1
        } else {
            pick
        }
    }
}

/// SART-specific result fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SartMetrics {
    /// Go trials without a response
    pub omissions: u32,
    /// Responses on no-go trials
    pub commissions: u32,
    /// Sample SD of valid correct reaction times
    pub reaction_time_variability: f64,
    pub hits: u32,
    pub go_trials: u32,
    pub no_go_trials: u32,
}

impl SartMetrics {
    pub fn summary_lines(&self) -> Vec<MetricLine> {
        let commission_rate = ratio(self.commissions as usize, self.no_go_trials as usize);
        vec![
            MetricLine::info("Hits", format!("{}/{}", self.hits, self.go_trials)),
            MetricLine::new(
                "Omissions",
                self.omissions.to_string(),
                if self.omissions == 0 {
                    MetricStatus::Ok
                } else {
                    MetricStatus::Warning
                },
            ),
            MetricLine::new(
                "Commissions",
                format!("{}/{}", self.commissions, self.no_go_trials),
                MetricStatus::grade(1.0 - commission_rate, 0.8, 0.5),
            ),
            MetricLine::info(
                "RT Variability",
                format!("{:.1} ms", self.reaction_time_variability),
            ),
        ]
    }
}

impl TaskLogic for SartLogic {
    fn test_type(&self) -> TestType {
        TestType::Sart
    }

    fn generate_sequence(&self, config: &TestConfig, rng: &mut dyn RngCore) -> Vec<Trial> {
        (0..config.total_trials)
            .map(|_| {
                let is_no_go = rng.random_bool(self.no_go_probability);
                let number = if is_no_go {
                    self.no_go_digit
                } else {
                    self.go_digit(rng)
                };
                Trial::Sart(SartTrial { number, is_no_go })
            })
            .collect()
    }

    fn validate_response(&self, trial: &Trial, input: &InputEvent) -> bool {
        match trial.as_sart() {
            Some(t) => !t.is_no_go && input.has_response,
            None => false,
        }
    }

    fn calculate_results(
        &self,
        responses: &[Response],
        config: &TestConfig,
        sequence: &[Trial],
    ) -> TaskResult {
        let go_trials = sequence
            .iter()
            .filter_map(Trial::as_sart)
            .filter(|t| !t.is_no_go)
            .count();
        let no_go_trials = sequence.iter().filter_map(Trial::as_sart).count() - go_trials;

        let on_go = |r: &&Response| r.stimulus.as_sart().is_some_and(|t| !t.is_no_go);
        let on_no_go = |r: &&Response| r.stimulus.as_sart().is_some_and(|t| t.is_no_go);

        let hits = responses.iter().filter(on_go).filter(|r| r.correct).count();
        let commissions = responses
            .iter()
            .filter(on_no_go)
            .filter(|r| r.responded)
            .count();
        let omissions = go_trials.saturating_sub(hits);

        let max_rt = config.stimulus_duration_ms as f64;
        let valid_rts: Vec<f64> = responses
            .iter()
            .filter(on_go)
            .filter(|r| r.correct && r.is_valid_rt(MIN_VALID_RT_MS, max_rt))
            .map(|r| r.response_time)
            .collect();

        let metrics = SartMetrics {
            omissions: omissions as u32,
            commissions: commissions as u32,
            reaction_time_variability: sample_std_dev(&valid_rts),
            hits: hits as u32,
            go_trials: go_trials as u32,
            no_go_trials: no_go_trials as u32,
        };

        TaskResult::new(
            ratio(hits, go_trials),
            mean(&valid_rts),
            responses,
            TaskMetrics::Sart(metrics),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_helpers::{responded, sart_sequence, timed_out};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> TestConfig {
        TestConfig::for_task(TestType::Sart)
    }

    fn metrics(result: &TaskResult) -> &SartMetrics {
        match &result.metrics {
            TaskMetrics::Sart(m) => m,
            other => panic!("expected SART metrics, got {other:?}"),
        }
    }

    #[test]
    fn no_go_digit_is_three_and_go_digits_skip_it() {
        let logic = SartLogic::default();
        let mut rng = StdRng::seed_from_u64(42);
        let sequence = logic.generate_sequence(&config().with_trials(500), &mut rng);

        let mut no_go = 0;
        for trial in sequence.iter().filter_map(Trial::as_sart) {
            assert!(trial.number <= 9);
            assert_eq!(trial.is_no_go, trial.number == 3);
            if trial.is_no_go {
                no_go += 1;
            }
        }
        // 20% of 500 with generous slack
        assert!((60..=140).contains(&no_go), "no-go count {no_go}");
    }

    #[test]
    fn go_digits_cover_all_nine_values() {
        let logic = SartLogic::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = [false; 10];
        for _ in 0..500 {
            seen[logic.go_digit(&mut rng) as usize] = true;
        }
        for (digit, hit) in seen.iter().enumerate() {
            assert_eq!(*hit, digit != 3, "digit {digit}");
        }
    }

    #[test]
    fn validate_go_and_no_go() {
        let logic = SartLogic::default();
        let go = Trial::Sart(SartTrial { number: 7, is_no_go: false });
        let no_go = Trial::Sart(SartTrial { number: 3, is_no_go: true });
        let press = InputEvent::click(0.0);
        let silence = InputEvent::timeout(0.0);

        assert!(logic.validate_response(&go, &press));
        assert!(!logic.validate_response(&go, &silence));
        assert!(!logic.validate_response(&no_go, &press));
    }

    #[test]
    fn withheld_no_go_scores_perfectly() {
        let logic = SartLogic::default();
        let sequence = sart_sequence(&[7, 3, 4]);
        let responses = vec![
            responded(&sequence[0], 350.0, true),
            timed_out(&sequence[1], 1000.0, false),
            responded(&sequence[2], 410.0, true),
        ];

        let result = logic.calculate_results(&responses, &config(), &sequence);
        let m = metrics(&result);
        assert_eq!(m.hits, 2);
        assert_eq!(m.omissions, 0);
        assert_eq!(m.commissions, 0);
        assert_eq!(result.accuracy, 1.0);
        assert_eq!(result.average_reaction_time, 380.0);
    }

    #[test]
    fn response_on_no_go_is_a_commission() {
        let logic = SartLogic::default();
        let sequence = sart_sequence(&[7, 3, 4]);
        let responses = vec![
            responded(&sequence[0], 350.0, true),
            responded(&sequence[1], 300.0, false),
            responded(&sequence[2], 410.0, true),
        ];

        let result = logic.calculate_results(&responses, &config(), &sequence);
        assert_eq!(metrics(&result).commissions, 1);
        assert_eq!(result.accuracy, 1.0);
    }

    #[test]
    fn missed_go_is_an_omission() {
        let logic = SartLogic::default();
        let sequence = sart_sequence(&[7, 3, 4]);
        let responses = vec![
            timed_out(&sequence[0], 1000.0, false),
            timed_out(&sequence[1], 1000.0, false),
            responded(&sequence[2], 410.0, true),
        ];

        let result = logic.calculate_results(&responses, &config(), &sequence);
        assert_eq!(metrics(&result).omissions, 1);
        assert_eq!(result.accuracy, 0.5);
    }

    #[test]
    fn variability_ignores_anticipations_and_late_rts() {
        let logic = SartLogic::default();
        let sequence = sart_sequence(&[1, 2, 4, 5]);
        let responses = vec![
            responded(&sequence[0], 80.0, true),
            responded(&sequence[1], 300.0, true),
            responded(&sequence[2], 500.0, true),
            responded(&sequence[3], 1000.0, true),
        ];

        let result = logic.calculate_results(&responses, &config(), &sequence);
        assert_eq!(result.average_reaction_time, 400.0);
        assert!((metrics(&result).reaction_time_variability - 141.421_356).abs() < 1e-3);
    }

    #[test]
    fn no_responses_yields_zero_defaults() {
        let logic = SartLogic::default();
        let sequence = sart_sequence(&[3, 3]);
        let result = logic.calculate_results(&[], &config(), &sequence);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.average_reaction_time, 0.0);
        assert_eq!(metrics(&result).reaction_time_variability, 0.0);
    }

    #[test]
    fn calculate_results_is_idempotent() {
        let logic = SartLogic::default();
        let sequence = sart_sequence(&[7, 3, 4, 9]);
        let responses = vec![
            responded(&sequence[0], 350.0, true),
            responded(&sequence[1], 290.0, false),
            responded(&sequence[3], 510.0, true),
        ];
        let a = logic.calculate_results(&responses, &config(), &sequence);
        let b = logic.calculate_results(&responses, &config(), &sequence);
        assert_eq!(a, b);
    }
}
