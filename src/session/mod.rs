//! Session orchestration: the four tasks back to back
//!
//! [`SessionOrchestrator`] runs SART, Flanker, 2-Back and PVT in that order,
//! one [`TrialEngine`] at a time. Each finished [`TaskResult`] is handed to
//! the configured [`ResultSink`] and appended to the [`Session`]. A short
//! transition pause separates the tasks. After the last one the session is
//! finalized and a [`SessionSummary`] is computed.

mod score;

pub use score::{
    normalize_reaction_time, AbilityProfile, SessionSummary, RT_CEILING_MS, RT_FLOOR_MS,
};

use crate::config::{Config, ConfigError};
use crate::engine::{EngineEvent, EnginePhase, TrialEngine};
use crate::input::InputEvent;
use crate::persist::{NullSink, ResultSink};
use crate::tasks::{Task, TaskResult, TestType};
use crate::timing::{Clock, MonotonicClock, Scheduler, TimerKind};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One sitting of the battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Epoch milliseconds when the first task started. Holds the creation
    /// time until then.
    pub start_time: i64,
    /// Set only once every task has a result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    pub completed_tests: Vec<TestType>,
    pub results: Vec<TaskResult>,
    pub is_sequential: bool,
    /// Results the sink has not accepted yet
    #[serde(skip)]
    unsynced: Vec<TaskResult>,
}

impl Session {
    pub fn new(start_time: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_time,
            end_time: None,
            completed_tests: Vec::new(),
            results: Vec::new(),
            is_sequential: true,
            unsynced: Vec::new(),
        }
    }

    /// Append a task's result. A second result for the same task is refused.
    pub fn record(&mut self, result: TaskResult) -> bool {
        let test_type = result.test_type();
        if self.completed_tests.contains(&test_type) || self.is_finalized() {
            warn!("session {}: duplicate {} result ignored", self.id, test_type);
            return false;
        }
        self.completed_tests.push(test_type);
        self.results.push(result);
        true
    }

    /// Set the end time if every task is done. Returns false otherwise.
    pub fn finalize(&mut self, end_time: i64) -> bool {
        if !self.is_complete() || self.is_finalized() {
            return false;
        }
        self.end_time = Some(end_time);
        true
    }

    pub fn is_complete(&self) -> bool {
        TestType::ORDER
            .iter()
            .all(|t| self.completed_tests.contains(t))
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn result_for(&self, test_type: TestType) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.test_type() == test_type)
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn unsynced(&self) -> &[TaskResult] {
        &self.unsynced
    }

    /// Offer every unsynced result to `sink` again. Returns how many are
    /// still unsynced afterwards.
    pub fn retry_unsynced(&mut self, sink: &mut dyn ResultSink) -> usize {
        let id = self.id.clone();
        self.unsynced.retain(|result| {
            let outcome = sink.save_result(&id, result);
            if !outcome.success {
                warn!(
                    "session {}: {} still unsynced: {}",
                    id,
                    result.test_type(),
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            !outcome.success
        });
        self.unsynced.len()
    }
}

/// Where the orchestrator is in the battery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Intro,
    Running(TestType),
    /// "Next up" pause before `next` starts
    Transition { next: TestType },
    Summary,
    Abandoned,
}

/// Something the host may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    Engine {
        test_type: TestType,
        event: EngineEvent,
    },
    /// The result was kept locally but the sink refused it
    PersistWarning {
        test_type: TestType,
        error: String,
    },
    Finished(SessionSummary),
}

type SessionCallback = Box<dyn FnMut(&[TaskResult])>;

/// Runs the four tasks in order and owns the [`Session`]
pub struct SessionOrchestrator<C: Clock + Clone = MonotonicClock> {
    config: Config,
    clock: C,
    rng: StdRng,
    scheduler: Scheduler,
    phase: SessionPhase,
    session: Option<Session>,
    active: Option<TrialEngine<Task, C>>,
    sink: Box<dyn ResultSink>,
    on_complete: Option<SessionCallback>,
    summary: Option<SessionSummary>,
}

impl<C: Clock + Clone> SessionOrchestrator<C> {
    pub fn new(config: Config, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.battery.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            config,
            clock,
            rng,
            scheduler: Scheduler::new(),
            phase: SessionPhase::Intro,
            session: None,
            active: None,
            sink: Box::new(NullSink),
            on_complete: None,
            summary: None,
        })
    }

    pub fn with_sink(mut self, sink: impl ResultSink + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    /// Called once with all four results after the last task
    pub fn with_completion(mut self, callback: impl FnMut(&[TaskResult]) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn set_sink(&mut self, sink: impl ResultSink + 'static) {
        self.sink = Box::new(sink);
    }

    /// Create the session and load the first task
    pub fn start(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.phase != SessionPhase::Intro {
            return events;
        }
        let session = Session::new(self.clock.epoch_ms());
        info!("session {} started", session.id);
        self.session = Some(session);
        self.launch(TestType::Sart, &mut events);
        events
    }

    /// Start signal for the loaded task (leaves its instructions screen)
    pub fn begin_task(&mut self) -> Vec<SessionEvent> {
        let Some(engine) = self.active.as_mut() else {
            return Vec::new();
        };
        let test_type = engine.test_type();
        let first_start = engine.phase() == EnginePhase::Instructions
            && test_type == TestType::ORDER[0];
        let events = wrap(test_type, engine.begin());
        if first_start {
            if let Some(session) = self.session.as_mut() {
                session.start_time = self.clock.epoch_ms();
            }
        }
        events
    }

    /// Fire due timers of the active task and of the transition pause
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let Some(engine) = self.active.as_mut() {
            let test_type = engine.test_type();
            let engine_events = engine.tick();
            self.absorb(test_type, engine_events, &mut events);
        }

        while let Some((_, kind, _)) = self.scheduler.pop_due(self.clock.now_ms()) {
            if kind != TimerKind::Transition {
                continue;
            }
            if let SessionPhase::Transition { next } = self.phase {
                self.launch(next, &mut events);
            }
        }
        events
    }

    /// Forward a participant input to the active task
    pub fn handle_input(&mut self, input: InputEvent) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(engine) = self.active.as_mut() {
            let test_type = engine.test_type();
            let engine_events = engine.handle_input(input);
            self.absorb(test_type, engine_events, &mut events);
        }
        events
    }

    /// Stop mid-battery. The running task is torn down without a result and
    /// the session is never finalized.
    pub fn abort(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(mut engine) = self.active.take() {
            engine.teardown();
        }
        self.scheduler.cancel_all();
        if !matches!(self.phase, SessionPhase::Summary | SessionPhase::Abandoned) {
            if let Some(session) = &self.session {
                info!(
                    "session {} abandoned after {} of 4 tasks",
                    session.id,
                    session.completed_tests.len()
                );
            }
            self.set_phase(SessionPhase::Abandoned, &mut events);
        }
        events
    }

    /// Replay unsynced results through the current sink
    pub fn retry_unsynced(&mut self) -> usize {
        match self.session.as_mut() {
            Some(session) => session.retry_unsynced(self.sink.as_mut()),
            None => 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> Option<&TrialEngine<Task, C>> {
        self.active.as_ref()
    }

    /// True while a task sits on its instructions screen
    pub fn awaiting_start(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|e| e.phase() == EnginePhase::Instructions)
    }

    /// Current reading of the orchestrator's clock, for stamping input
    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Milliseconds left in the transition pause
    pub fn transition_remaining_ms(&self) -> Option<f64> {
        match self.phase {
            SessionPhase::Transition { .. } => self
                .scheduler
                .next_deadline()
                .map(|due| (due - self.clock.now_ms()).max(0.0)),
            _ => None,
        }
    }

    fn set_phase(&mut self, phase: SessionPhase, events: &mut Vec<SessionEvent>) {
        if self.phase != phase {
            self.phase = phase;
            events.push(SessionEvent::PhaseChanged(phase));
        }
    }

    fn launch(&mut self, test_type: TestType, events: &mut Vec<SessionEvent>) {
        let config = self.config.test_config(test_type).clone();
        match TrialEngine::new(
            Task::for_type(test_type),
            config,
            self.clock.clone(),
            &mut self.rng,
        ) {
            Ok(engine) => {
                info!("loading {}", test_type.name());
                self.active = Some(engine.with_countdown(self.config.battery.countdown_from));
                self.set_phase(SessionPhase::Running(test_type), events);
            }
            Err(err) => {
                error!("could not start {}: {}", test_type.name(), err);
                events.extend(self.abort());
            }
        }
    }

    fn absorb(
        &mut self,
        test_type: TestType,
        engine_events: Vec<EngineEvent>,
        events: &mut Vec<SessionEvent>,
    ) {
        for event in engine_events {
            let completed = match &event {
                EngineEvent::Completed(result) => Some(result.clone()),
                _ => None,
            };
            events.push(SessionEvent::Engine { test_type, event });
            if let Some(result) = completed {
                self.complete_task(result, events);
            }
        }
    }

    fn complete_task(&mut self, result: TaskResult, events: &mut Vec<SessionEvent>) {
        let test_type = result.test_type();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let outcome = self.sink.save_result(&session.id, &result);
        if !outcome.success {
            let error = outcome
                .error
                .unwrap_or_else(|| "unknown error".to_string());
            warn!(
                "session {}: saving {} failed, keeping it locally: {}",
                session.id, test_type, error
            );
            session.unsynced.push(result.clone());
            events.push(SessionEvent::PersistWarning { test_type, error });
        }
        session.record(result);
        self.active = None;

        match test_type.next() {
            Some(next) => self.transition_to(next, events),
            None => self.finish(events),
        }
    }

    fn transition_to(&mut self, next: TestType, events: &mut Vec<SessionEvent>) {
        let delay = self.config.battery.transition_delay_ms;
        if delay == 0 {
            self.launch(next, events);
            return;
        }
        self.set_phase(SessionPhase::Transition { next }, events);
        self.scheduler
            .schedule(TimerKind::Transition, self.clock.now_ms(), delay);
    }

    fn finish(&mut self, events: &mut Vec<SessionEvent>) {
        let end = self.clock.epoch_ms();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.finalize(end) {
            warn!("session {} ended incomplete", session.id);
            return;
        }

        let summary = SessionSummary::from_results(&session.results);
        info!(
            "session {} finished: score {}, mean accuracy {:.1}%",
            session.id,
            summary.score,
            summary.mean_accuracy * 100.0
        );
        if let Some(callback) = self.on_complete.as_mut() {
            callback(&session.results);
        }
        self.summary = Some(summary.clone());
        self.set_phase(SessionPhase::Summary, events);
        events.push(SessionEvent::Finished(summary));
    }
}

fn wrap(test_type: TestType, engine_events: Vec<EngineEvent>) -> Vec<SessionEvent> {
    engine_events
        .into_iter()
        .map(|event| SessionEvent::Engine { test_type, event })
        .collect()
}
