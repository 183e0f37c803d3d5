//! Integration tests for the cognitive battery
//!
//! These tests drive the public API end to end: task logic scoring, a single
//! task through the trial engine, and the four-task session with result
//! sinks and reports, all on a hand-driven clock.

use cognitive_battery::config::{Config, TestConfig, Theme};
use cognitive_battery::engine::{DisplayState, EngineEvent, EnginePhase, TrialEngine, TrialStage};
use cognitive_battery::input::{Direction, InputEvent, ResponseKey};
use cognitive_battery::persist::JsonDirSink;
use cognitive_battery::report::SessionReport;
use cognitive_battery::session::{SessionEvent, SessionOrchestrator, SessionPhase};
use cognitive_battery::tasks::{
    FlankerTrial, FlankerType, NBackTrial, PvtTrial, Response, SartTrial, Task, TaskLogic,
    TaskMetrics, TestType, Trial,
};
use cognitive_battery::timing::{Clock, ManualClock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::env;
use std::fs;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sart(number: u8) -> Trial {
    Trial::Sart(SartTrial {
        number,
        is_no_go: number == 3,
    })
}

fn answer(trial: &Trial, response_time: f64, correct: bool) -> Response {
    Response {
        stimulus: trial.clone(),
        response_time,
        correct,
        timestamp: ManualClock::DEFAULT_EPOCH_MS,
        responded: true,
    }
}

/// Record the way the engine does when the window closes without input
fn silent(task: &Task, trial: &Trial, response_time: f64) -> Response {
    let correct = task.validate_response(trial, &InputEvent::timeout(0.0));
    Response {
        responded: false,
        ..answer(trial, response_time, correct)
    }
}

fn quick_config() -> Config {
    let mut config = Config::default();
    config.battery.seed = Some(2024);
    config.battery.countdown_from = 0;
    config.battery.transition_delay_ms = 300;
    config.sart.total_trials = 4;
    config.flanker.total_trials = 4;
    config.nback.total_trials = 4;
    config.pvt.total_trials = 2;
    config
}

fn temp_path(name: &str) -> std::path::PathBuf {
    env::temp_dir().join(format!("cognitive-battery-it-{}-{}", name, std::process::id()))
}

/// Step the session 1 ms at a time. Every visible stimulus gets a response
/// after `respond_after` ms: space, or the correct arrow for flanker rows.
fn run_session(
    orchestrator: &mut SessionOrchestrator<ManualClock>,
    clock: &ManualClock,
    respond_after: f64,
) -> Vec<SessionEvent> {
    let mut events = orchestrator.start();
    for _ in 0..200_000 {
        if orchestrator.awaiting_start() {
            events.extend(orchestrator.begin_task());
        }
        clock.advance(1.0);
        events.extend(orchestrator.tick());

        let key = orchestrator.engine().and_then(|engine| match engine.display() {
            DisplayState::Stimulus { trial, elapsed_ms }
                if elapsed_ms >= respond_after =>
            {
                Some(match trial {
                    Trial::Flanker(t) => ResponseKey::from(t.target_direction),
                    _ => ResponseKey::Space,
                })
            }
            _ => None,
        });
        if let Some(key) = key {
            let input = InputEvent::keyboard(key, clock.now_ms());
            events.extend(orchestrator.handle_input(input));
        }

        if matches!(
            orchestrator.phase(),
            SessionPhase::Summary | SessionPhase::Abandoned
        ) {
            break;
        }
    }
    events
}

// ---------------------------------------------------------------------------
// Task logic properties
// ---------------------------------------------------------------------------

#[test]
fn sequence_length_matches_total_trials() {
    for test_type in TestType::ORDER {
        let task = Task::for_type(test_type);
        for (seed, trials) in [(1u64, 1usize), (2, 7), (3, 40), (4, 101)] {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = TestConfig::for_task(test_type).with_trials(trials);
            let sequence = task.generate_sequence(&config, &mut rng);
            assert_eq!(sequence.len(), trials, "{test_type} with {trials} trials");
            assert!(sequence.iter().all(|t| t.test_type() == test_type));
        }
    }
}

#[test]
fn nback_never_targets_the_first_two_positions() {
    let task = Task::for_type(TestType::NBack);
    for seed in 0..25 {
        let mut rng = StdRng::seed_from_u64(seed);
        let config = TestConfig::for_task(TestType::NBack);
        for trial in task.generate_sequence(&config, &mut rng).iter().filter_map(Trial::as_nback) {
            if trial.position < 2 {
                assert!(!trial.is_target);
            }
        }
    }
}

#[test]
fn sart_go_no_go_example() {
    let task = Task::for_type(TestType::Sart);
    let config = TestConfig::for_task(TestType::Sart);
    let sequence = vec![sart(7), sart(3), sart(4)];

    let withheld = vec![
        answer(&sequence[0], 320.0, true),
        silent(&task, &sequence[1], 1000.0),
        answer(&sequence[2], 410.0, true),
    ];
    let result = task.calculate_results(&withheld, &config, &sequence);
    let TaskMetrics::Sart(m) = &result.metrics else {
        panic!("expected SART metrics");
    };
    assert_eq!((m.hits, m.omissions, m.commissions), (2, 0, 0));
    assert_eq!(result.accuracy, 1.0);

    let pressed = vec![
        answer(&sequence[0], 320.0, true),
        answer(&sequence[1], 280.0, false),
        answer(&sequence[2], 410.0, true),
    ];
    let result = task.calculate_results(&pressed, &config, &sequence);
    let TaskMetrics::Sart(m) = &result.metrics else {
        panic!("expected SART metrics");
    };
    assert_eq!(m.commissions, 1);
}

#[test]
fn flanker_interference_example() {
    let task = Task::for_type(TestType::Flanker);
    let config = TestConfig::for_task(TestType::Flanker);
    let sequence = vec![
        Trial::Flanker(FlankerTrial::new(Direction::Left, FlankerType::Congruent)),
        Trial::Flanker(FlankerTrial::new(Direction::Right, FlankerType::Incongruent)),
    ];
    let responses = vec![
        answer(&sequence[0], 300.0, true),
        answer(&sequence[1], 420.0, true),
    ];
    let result = task.calculate_results(&responses, &config, &sequence);
    let TaskMetrics::Flanker(m) = &result.metrics else {
        panic!("expected flanker metrics");
    };
    assert_eq!(m.interference_effect, 120.0);
    assert_eq!(result.accuracy, 1.0);
}

#[test]
fn nback_aba_hit_and_miss() {
    let task = Task::for_type(TestType::NBack);
    let config = TestConfig::for_task(TestType::NBack);
    let sequence: Vec<Trial> = "ABA"
        .chars()
        .enumerate()
        .map(|(position, letter)| {
            Trial::NBack(NBackTrial {
                letter,
                is_target: position == 2,
                position,
            })
        })
        .collect();

    let hit = vec![answer(&sequence[2], 500.0, true)];
    let TaskMetrics::NBack(m) = task.calculate_results(&hit, &config, &sequence).metrics else {
        panic!("expected n-back metrics");
    };
    assert_eq!((m.hits, m.misses), (1, 0));

    let TaskMetrics::NBack(m) = task.calculate_results(&[], &config, &sequence).metrics else {
        panic!("expected n-back metrics");
    };
    assert_eq!((m.hits, m.misses), (0, 1));
}

#[test]
fn calculate_results_is_idempotent_and_bounded() {
    for test_type in TestType::ORDER {
        let task = Task::for_type(test_type);
        let config = TestConfig::for_task(test_type).with_trials(12);
        let mut rng = StdRng::seed_from_u64(77);
        let sequence = task.generate_sequence(&config, &mut rng);
        let responses: Vec<Response> = sequence
            .iter()
            .enumerate()
            .map(|(i, trial)| {
                let input = InputEvent::keyboard(ResponseKey::Left, 0.0);
                answer(trial, 250.0 + 20.0 * i as f64, task.validate_response(trial, &input))
            })
            .collect();

        let first = task.calculate_results(&responses, &config, &sequence);
        let second = task.calculate_results(&responses, &config, &sequence);
        assert_eq!(first, second, "{test_type}");
        assert!((0.0..=1.0).contains(&first.accuracy));
        assert_eq!(first.start_time, 0);
    }
}

// ---------------------------------------------------------------------------
// Trial engine
// ---------------------------------------------------------------------------

#[test]
fn pvt_false_start_through_the_engine() {
    let clock = ManualClock::new();
    let mut rng = StdRng::seed_from_u64(3);
    let config = TestConfig::for_task(TestType::Pvt).with_trials(1);
    let mut engine = TrialEngine::new(Task::for_type(TestType::Pvt), config, clock.clone(), &mut rng)
        .expect("valid config")
        .with_countdown(0);

    engine.begin();
    assert_eq!(engine.stage(), TrialStage::PreStimulus);

    clock.advance(150.0);
    let events = engine.handle_input(InputEvent::keyboard(ResponseKey::Space, clock.now_ms()));
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::ResponseRecorded { correct: false, before_onset: true, .. }
    )));

    for _ in 0..10_000 {
        clock.advance(1.0);
        engine.tick();
        if engine.phase().is_terminal() {
            break;
        }
    }
    let result = engine.result().expect("finished");
    let TaskMetrics::Pvt(m) = &result.metrics else {
        panic!("expected PVT metrics");
    };
    assert_eq!(m.false_starts, 1);
    assert_eq!(result.average_reaction_time, 0.0);
    assert_eq!(result.responses[0].response_time, 150.0);
    assert_eq!(engine.pending_timers(), 0);
}

#[test]
fn standalone_engine_invokes_completion_once() {
    let clock = ManualClock::new();
    let mut rng = StdRng::seed_from_u64(8);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let config = TestConfig::for_task(TestType::Sart).with_trials(3);
    let mut engine = TrialEngine::new(Task::for_type(TestType::Sart), config, clock.clone(), &mut rng)
        .expect("valid config")
        .with_countdown(1)
        .with_completion(move |result| sink.borrow_mut().push(result.clone()));

    engine.begin();
    assert_eq!(engine.phase(), EnginePhase::Countdown);
    for _ in 0..20_000 {
        clock.advance(1.0);
        engine.tick();
    }
    assert_eq!(engine.phase(), EnginePhase::Results);
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].responses.len(), 3);
    assert!(seen[0].responses.iter().all(|r| !r.responded));
}

#[test]
fn teardown_mid_run_cancels_every_timer() {
    let clock = ManualClock::new();
    let mut rng = StdRng::seed_from_u64(4);
    let config = TestConfig::for_task(TestType::Flanker).with_trials(6);
    let mut engine = TrialEngine::new(Task::for_type(TestType::Flanker), config, clock.clone(), &mut rng)
        .expect("valid config")
        .with_countdown(0);
    engine.begin();
    clock.advance(100.0);
    engine.tick();
    assert!(engine.pending_timers() > 0);

    engine.teardown();
    assert_eq!(engine.pending_timers(), 0);
    assert_eq!(engine.phase(), EnginePhase::Aborted);

    clock.advance(60_000.0);
    assert!(engine.tick().is_empty());
    assert!(engine.result().is_none());
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[test]
fn full_session_finalizes_with_four_results() {
    let clock = ManualClock::new();
    let completed = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&completed);
    let mut orchestrator = SessionOrchestrator::new(quick_config(), clock.clone())
        .expect("valid config")
        .with_completion(move |results| *counter.borrow_mut() = results.len());

    let events = run_session(&mut orchestrator, &clock, 300.0);

    assert_eq!(orchestrator.phase(), SessionPhase::Summary);
    let session = orchestrator.session().expect("session");
    assert_eq!(session.results.len(), 4);
    assert!(session.end_time.is_some());
    assert_eq!(*completed.borrow(), 4);

    let order: Vec<TestType> = session.results.iter().map(|r| r.test_type()).collect();
    assert_eq!(order, TestType::ORDER.to_vec());
    for result in &session.results {
        assert!((0.0..=1.0).contains(&result.accuracy));
        assert!(result.end_time >= result.start_time);
        assert_eq!(result.duration, result.end_time - result.start_time);
    }

    // Flanker answered with the right arrow every time
    let flanker = session.result_for(TestType::Flanker).expect("flanker");
    assert_eq!(flanker.accuracy, 1.0);

    let summary = orchestrator.summary().expect("summary");
    assert!(summary.score <= 100);
    assert!(events.iter().any(|e| matches!(e, SessionEvent::Finished(_))));
}

#[test]
fn abandoned_session_keeps_end_time_unset() {
    let clock = ManualClock::new();
    let mut orchestrator =
        SessionOrchestrator::new(quick_config(), clock.clone()).expect("valid config");
    orchestrator.start();
    orchestrator.begin_task();
    // Let the SART finish, then stop during the flanker
    for _ in 0..30_000 {
        clock.advance(1.0);
        orchestrator.tick();
        if orchestrator.awaiting_start() {
            orchestrator.begin_task();
        }
        if orchestrator.phase() == SessionPhase::Running(TestType::Flanker) {
            break;
        }
    }
    clock.advance(50.0);
    orchestrator.tick();
    orchestrator.abort();

    assert_eq!(orchestrator.phase(), SessionPhase::Abandoned);
    let session = orchestrator.session().expect("session");
    assert_eq!(session.completed_tests, vec![TestType::Sart]);
    assert!(session.end_time.is_none());
    assert!(orchestrator.summary().is_none());

    let report = SessionReport::from_session(session);
    assert!(!report.summary.finished);
    assert_eq!(report.summary.score, None);
}

#[test]
fn failed_saves_are_replayed_to_a_working_sink() {
    let blocker = temp_path("blocker");
    fs::write(&blocker, "not a directory").expect("create blocker file");
    let good_dir = temp_path("results");

    let clock = ManualClock::new();
    let mut orchestrator = SessionOrchestrator::new(quick_config(), clock.clone())
        .expect("valid config")
        .with_sink(JsonDirSink::new(&blocker));
    let events = run_session(&mut orchestrator, &clock, 250.0);

    let warned: Vec<TestType> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PersistWarning { test_type, .. } => Some(*test_type),
            _ => None,
        })
        .collect();
    assert_eq!(warned, TestType::ORDER.to_vec());
    let session = orchestrator.session().expect("session");
    assert!(session.is_finalized());
    assert_eq!(session.unsynced().len(), 4);

    orchestrator.set_sink(JsonDirSink::new(&good_dir));
    assert_eq!(orchestrator.retry_unsynced(), 0);
    let written = fs::read_dir(&good_dir).expect("results dir").count();
    assert_eq!(written, 4);

    fs::remove_file(&blocker).ok();
    fs::remove_dir_all(&good_dir).ok();
}

#[test]
fn task_result_wire_shape() {
    let clock = ManualClock::new();
    let mut orchestrator =
        SessionOrchestrator::new(quick_config(), clock.clone()).expect("valid config");
    run_session(&mut orchestrator, &clock, 300.0);
    let session = orchestrator.session().expect("session");

    for result in &session.results {
        let value = serde_json::to_value(result).expect("serialize");
        assert_eq!(value["testType"], result.test_type().id());
        for key in [
            "startTime",
            "endTime",
            "duration",
            "accuracy",
            "averageReactionTime",
            "responses",
        ] {
            assert!(value.get(key).is_some(), "{} missing {}", result.test_type(), key);
        }
        let response = &value["responses"][0];
        for key in ["stimulus", "responseTime", "correct", "timestamp"] {
            assert!(response.get(key).is_some(), "response missing {}", key);
        }
    }

    let pvt = serde_json::to_value(session.result_for(TestType::Pvt).expect("pvt")).expect("json");
    for key in ["lapses", "minRT", "maxRT", "falseStarts"] {
        assert!(pvt.get(key).is_some(), "pvt missing {}", key);
    }
    let first = &pvt["responses"][0]["stimulus"];
    let stimulus: PvtTrial = serde_json::from_value(first.clone()).expect("pvt stimulus");
    assert_eq!(stimulus.trial_number, 1);
}

// ---------------------------------------------------------------------------
// Report and config
// ---------------------------------------------------------------------------

#[test]
fn finished_session_report_round_trip() {
    let clock = ManualClock::new();
    let mut orchestrator =
        SessionOrchestrator::new(quick_config(), clock.clone()).expect("valid config");
    run_session(&mut orchestrator, &clock, 300.0);

    let report = SessionReport::from_session(orchestrator.session().expect("session"));
    assert!(report.summary.finished);
    assert_eq!(report.summary.completed_tests, 4);
    assert_eq!(
        report.summary.score,
        orchestrator.summary().map(|s| s.score)
    );

    let path = temp_path("report.json");
    report.export_json(&path).expect("export");
    let back: SessionReport =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(back.tasks.len(), 4);
    assert!(report.to_text().contains("Vigilance"));
    fs::remove_file(&path).ok();
}

#[test]
fn config_round_trip_and_validation() {
    let path = temp_path("config.toml");
    let mut config = quick_config();
    config.ui.theme = Theme::Light;
    config.output.export_report = true;
    config.save_to(&path).expect("save");

    let loaded = Config::load_from(&path).expect("load");
    assert_eq!(loaded.sart.total_trials, 4);
    assert_eq!(loaded.battery.seed, Some(2024));
    assert_eq!(loaded.ui.theme, Theme::Light);
    assert!(loaded.output.export_report);
    fs::remove_file(&path).ok();

    let mut broken = quick_config();
    broken.flanker.total_trials = 0;
    assert!(SessionOrchestrator::new(broken, ManualClock::new()).is_err());
}

#[test]
fn seeded_sessions_draw_identical_sequences() {
    let first = SessionOrchestrator::new(quick_config(), ManualClock::new()).map(|mut o| {
        o.start();
        o.engine().map(|e| e.sequence().to_vec())
    });
    let second = SessionOrchestrator::new(quick_config(), ManualClock::new()).map(|mut o| {
        o.start();
        o.engine().map(|e| e.sequence().to_vec())
    });
    let (Ok(Some(a)), Ok(Some(b))) = (first, second) else {
        panic!("sessions should start");
    };
    assert_eq!(a, b);
    assert_eq!(a.len(), 4);
}
