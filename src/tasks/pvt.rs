//! Psychomotor Vigilance Task

use super::stats::{mean, median, ratio};
use super::{
    MetricLine, MetricStatus, PvtTrial, Response, TaskLogic, TaskMetrics, TaskResult, TestType,
    Trial,
};
use crate::config::TestConfig;
use crate::input::InputEvent;
use crate::utils::MinMaxExt;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Lower edge of the minor-lapse band, in milliseconds
const MINOR_LAPSE_FLOOR_MS: f64 = 355.0;

/// Wait-then-react vigilance task
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvtLogic {
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    /// Reactions at or below this count as anticipations. The upper bound
    /// is the task's response window (`stimulus_duration_ms`).
    pub min_valid_rt_ms: f64,
    /// Valid reactions slower than this are lapses
    pub lapse_threshold_ms: f64,
}

impl Default for PvtLogic {
    fn default() -> Self {
        Self {
            min_wait_ms: 2000,
            max_wait_ms: 7000,
            min_valid_rt_ms: 100.0,
            lapse_threshold_ms: 500.0,
        }
    }
}

/// Vigilance-specific result fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvtMetrics {
    /// Valid reactions slower than the lapse threshold
    pub lapses: u32,
    #[serde(rename = "minRT")]
    pub min_rt: f64,
    #[serde(rename = "maxRT")]
    pub max_rt: f64,
    /// Responses that did not produce a valid reaction time
    pub false_starts: u32,
    #[serde(rename = "medianRT")]
    pub median_rt: f64,
    pub minor_lapses: u32,
    /// Trials whose window closed with no response
    pub timeouts: u32,
}

impl PvtMetrics {
    pub fn summary_lines(&self) -> Vec<MetricLine> {
        vec![
            MetricLine::info("Median RT", format!("{:.0} ms", self.median_rt)),
            MetricLine::info(
                "Range",
                format!("{:.0} - {:.0} ms", self.min_rt, self.max_rt),
            ),
            MetricLine::new(
                "Lapses",
                self.lapses.to_string(),
                match self.lapses {
                    0 => MetricStatus::Ok,
                    1..=2 => MetricStatus::Warning,
                    _ => MetricStatus::Error,
                },
            ),
            MetricLine::info("Minor Lapses", self.minor_lapses.to_string()),
            MetricLine::new(
                "False Starts",
                self.false_starts.to_string(),
                if self.false_starts == 0 {
                    MetricStatus::Ok
                } else {
                    MetricStatus::Warning
                },
            ),
            MetricLine::info("Timeouts", self.timeouts.to_string()),
        ]
    }
}

impl TaskLogic for PvtLogic {
    fn test_type(&self) -> TestType {
        TestType::Pvt
    }

    fn generate_sequence(&self, config: &TestConfig, rng: &mut dyn RngCore) -> Vec<Trial> {
        (0..config.total_trials)
            .map(|i| {
                Trial::Pvt(PvtTrial {
                    trial_number: i + 1,
                    wait_time: rng.random_range(self.min_wait_ms..=self.max_wait_ms),
                })
            })
            .collect()
    }

    /// A press after onset that is not an anticipation. The engine only
    /// accepts input while the window is open, so slow reactions still
    /// inside it are valid (and count as lapses later).
    fn validate_response(&self, trial: &Trial, input: &InputEvent) -> bool {
        trial.as_pvt().is_some()
            && input.has_response
            && !input.before_onset
            && input.response_time > self.min_valid_rt_ms
    }

    fn calculate_results(
        &self,
        responses: &[Response],
        config: &TestConfig,
        sequence: &[Trial],
    ) -> TaskResult {
        let max_rt = config.stimulus_duration_ms as f64;
        let valid_rts: Vec<f64> = responses
            .iter()
            .filter(|r| r.correct && r.is_valid_rt(self.min_valid_rt_ms, max_rt))
            .map(|r| r.response_time)
            .collect();

        let mut fastest: Option<f64> = None;
        let mut slowest: Option<f64> = None;
        for &rt in &valid_rts {
            fastest.update_min(rt);
            slowest.update_max(rt);
        }

        let responded = responses.iter().filter(|r| r.responded).count();
        let lapses = valid_rts
            .iter()
            .filter(|&&rt| rt > self.lapse_threshold_ms)
            .count();
        let minor_lapses = valid_rts
            .iter()
            .filter(|&&rt| (MINOR_LAPSE_FLOOR_MS..=self.lapse_threshold_ms).contains(&rt))
            .count();

        let metrics = PvtMetrics {
            lapses: lapses as u32,
            min_rt: fastest.unwrap_or(0.0),
            max_rt: slowest.unwrap_or(0.0),
            false_starts: responded.saturating_sub(valid_rts.len()) as u32,
            median_rt: median(&valid_rts),
            minor_lapses: minor_lapses as u32,
            timeouts: responses.iter().filter(|r| !r.responded).count() as u32,
        };

        TaskResult::new(
            ratio(valid_rts.len(), sequence.len()),
            mean(&valid_rts),
            responses,
            TaskMetrics::Pvt(metrics),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ResponseKey;
    use crate::tasks::test_helpers::{false_start, pvt_sequence, responded, timed_out};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> TestConfig {
        TestConfig::for_task(TestType::Pvt)
    }

    fn metrics(result: &TaskResult) -> &PvtMetrics {
        match &result.metrics {
            TaskMetrics::Pvt(m) => m,
            other => panic!("expected PVT metrics, got {other:?}"),
        }
    }

    #[test]
    fn wait_times_stay_in_range() {
        let logic = PvtLogic::default();
        let mut rng = StdRng::seed_from_u64(77);
        let sequence = logic.generate_sequence(&config().with_trials(200), &mut rng);
        for (i, trial) in sequence.iter().filter_map(Trial::as_pvt).enumerate() {
            assert_eq!(trial.trial_number, i + 1);
            assert!((2000..=7000).contains(&trial.wait_time));
        }
    }

    #[test]
    fn validate_requires_onset_and_window() {
        let logic = PvtLogic::default();
        let trial = pvt_sequence(1).remove(0);
        let press = |rt: f64| InputEvent::keyboard(ResponseKey::Space, 0.0).with_response_time(rt);

        assert!(logic.validate_response(&trial, &press(250.0)));
        assert!(!logic.validate_response(&trial, &press(100.0)));
        assert!(logic.validate_response(&trial, &press(4000.0)));

        let mut early = press(250.0);
        early.before_onset = true;
        assert!(!logic.validate_response(&trial, &early));
        assert!(!logic.validate_response(&trial, &InputEvent::timeout(0.0)));
    }

    #[test]
    fn false_start_is_excluded_from_average() {
        let logic = PvtLogic::default();
        let sequence = pvt_sequence(3);
        let responses = vec![
            false_start(&sequence[0], 150.0),
            responded(&sequence[1], 300.0, true),
            responded(&sequence[2], 400.0, true),
        ];

        let result = logic.calculate_results(&responses, &config(), &sequence);
        let m = metrics(&result);
        assert_eq!(m.false_starts, 1);
        assert_eq!(result.average_reaction_time, 350.0);
        assert!((result.accuracy - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn lapses_and_range() {
        let logic = PvtLogic::default();
        let sequence = pvt_sequence(5);
        let responses = vec![
            responded(&sequence[0], 240.0, true),
            responded(&sequence[1], 380.0, true),
            responded(&sequence[2], 620.0, true),
            responded(&sequence[3], 910.0, true),
            timed_out(&sequence[4], 3000.0, false),
        ];

        let result = logic.calculate_results(&responses, &config(), &sequence);
        let m = metrics(&result);
        assert_eq!(m.lapses, 2);
        assert_eq!(m.minor_lapses, 1);
        assert_eq!(m.min_rt, 240.0);
        assert_eq!(m.max_rt, 910.0);
        assert_eq!(m.median_rt, 500.0);
        assert_eq!(m.timeouts, 1);
        assert_eq!(m.false_starts, 0);
        assert_eq!(result.accuracy, 0.8);
    }

    #[test]
    fn slow_reaction_in_a_wide_window_is_a_lapse() {
        let logic = PvtLogic::default();
        let mut wide = config();
        wide.stimulus_duration_ms = 5000;
        let sequence = pvt_sequence(2);
        let press = InputEvent::keyboard(ResponseKey::Space, 0.0).with_response_time(4000.0);
        let correct = logic.validate_response(&sequence[0], &press);
        assert!(correct);

        let responses = vec![
            responded(&sequence[0], 4000.0, correct),
            responded(&sequence[1], 300.0, true),
        ];
        let result = logic.calculate_results(&responses, &wide, &sequence);
        let m = metrics(&result);
        assert_eq!(m.false_starts, 0);
        assert_eq!(m.lapses, 1);
        assert_eq!(m.max_rt, 4000.0);
        assert_eq!(result.accuracy, 1.0);
        assert_eq!(result.average_reaction_time, 2150.0);
    }

    #[test]
    fn no_valid_responses_defaults_to_zero() {
        let logic = PvtLogic::default();
        let sequence = pvt_sequence(2);
        let responses = vec![
            timed_out(&sequence[0], 3000.0, false),
            timed_out(&sequence[1], 3000.0, false),
        ];
        let result = logic.calculate_results(&responses, &config(), &sequence);
        let m = metrics(&result);
        assert_eq!(m.min_rt, 0.0);
        assert_eq!(m.max_rt, 0.0);
        assert_eq!(result.average_reaction_time, 0.0);
        assert_eq!(result.accuracy, 0.0);
    }
}
