//! Shared test utilities for task logic modules
//!
//! Builds fixed trial sequences and hand-made responses so scoring tests do
//! not depend on the random generators.

use super::{NBackTrial, PvtTrial, Response, SartTrial, TaskLogic, Trial};
use crate::input::{InputEvent, ResponseKey};

/// Epoch milliseconds stamped on fabricated responses
pub const TEST_EPOCH_MS: i64 = 1_704_067_200_000;

/// A response the participant actually gave
pub fn responded(trial: &Trial, response_time: f64, correct: bool) -> Response {
    Response {
        stimulus: trial.clone(),
        response_time,
        correct,
        timestamp: TEST_EPOCH_MS,
        responded: true,
    }
}

/// A record synthesized when the window closed without input
pub fn timed_out(trial: &Trial, response_time: f64, correct: bool) -> Response {
    Response {
        responded: false,
        ..responded(trial, response_time, correct)
    }
}

/// A press that arrived before the stimulus appeared
pub fn false_start(trial: &Trial, response_time: f64) -> Response {
    responded(trial, response_time, false)
}

/// SART trials for the given digits; 3 is the no-go digit
pub fn sart_sequence(digits: &[u8]) -> Vec<Trial> {
    digits
        .iter()
        .map(|&number| {
            Trial::Sart(SartTrial {
                number,
                is_no_go: number == 3,
            })
        })
        .collect()
}

/// 2-back trials for a letter string, with targets derived from the letters
pub fn nback_sequence(letters: &str) -> Vec<Trial> {
    let letters: Vec<char> = letters.chars().collect();
    letters
        .iter()
        .enumerate()
        .map(|(position, &letter)| {
            Trial::NBack(NBackTrial {
                letter,
                is_target: position >= 2 && letters[position - 2] == letter,
                position,
            })
        })
        .collect()
}

/// PVT trials with a fixed 3 s wait
pub fn pvt_sequence(count: usize) -> Vec<Trial> {
    (1..=count)
        .map(|trial_number| {
            Trial::Pvt(PvtTrial {
                trial_number,
                wait_time: 3000,
            })
        })
        .collect()
}

/// Press a key on every trial and let the task judge it
pub fn answer_all(task: &dyn TaskLogic, sequence: &[Trial], response_time: f64) -> Vec<Response> {
    sequence
        .iter()
        .map(|trial| {
            let input = InputEvent::keyboard(ResponseKey::Left, 0.0)
                .with_response_time(response_time);
            responded(trial, response_time, task.validate_response(trial, &input))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nback_sequence_marks_two_back_matches() {
        let sequence = nback_sequence("ABA");
        let targets: Vec<bool> = sequence
            .iter()
            .filter_map(Trial::as_nback)
            .map(|t| t.is_target)
            .collect();
        assert_eq!(targets, vec![false, false, true]);
    }

    #[test]
    fn timed_out_clears_responded() {
        let trial = pvt_sequence(1).remove(0);
        assert!(responded(&trial, 300.0, true).responded);
        assert!(!timed_out(&trial, 3000.0, false).responded);
    }
}
