//! Trial engine: the timer-driven state machine that runs one task
//!
//! The engine owns the trial sequence and the response list for a single
//! run. It never sleeps: the host feeds it input through
//! [`TrialEngine::handle_input`] and calls [`TrialEngine::tick`] often enough
//! for timers to fire on time. Both return the [`EngineEvent`]s produced.
//!
//! ```
//! use cognitive_battery::engine::{EnginePhase, TrialEngine};
//! use cognitive_battery::input::InputEvent;
//! use cognitive_battery::tasks::{Task, TestType};
//! use cognitive_battery::timing::{Clock, ManualClock};
//! use cognitive_battery::config::TestConfig;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let clock = ManualClock::new();
//! let config = TestConfig::for_task(TestType::Sart).with_trials(2);
//! let mut rng = StdRng::seed_from_u64(1);
//! let mut engine = TrialEngine::new(Task::for_type(TestType::Sart), config, clock.clone(), &mut rng)
//!     .unwrap()
//!     .with_countdown(0);
//!
//! engine.begin();
//! while engine.phase() != EnginePhase::Results {
//!     clock.advance(10.0);
//!     engine.handle_input(InputEvent::click(clock.now_ms()));
//!     engine.tick();
//! }
//! assert_eq!(engine.result().unwrap().responses.len(), 2);
//! ```

mod state;

pub use state::{DisplayState, EngineError, EngineEvent, EnginePhase, TrialStage};

use crate::config::{ConfigError, TestConfig};
use crate::input::{InputEvent, ResponseGate};
use crate::tasks::{Response, Task, TaskLogic, TaskResult, TestType, Trial};
use crate::timing::{Clock, MonotonicClock, Scheduler, TimerHandle, TimerKind};
use log::{debug, info, trace};
use rand::RngCore;

/// Interval between countdown steps
pub const COUNTDOWN_STEP_MS: u64 = 1000;

/// Default countdown start value
pub const DEFAULT_COUNTDOWN: u8 = 3;

type CompletionCallback = Box<dyn FnMut(&TaskResult)>;

/// Runs one task from instructions to result
pub struct TrialEngine<L: TaskLogic = Task, C: Clock = MonotonicClock> {
    logic: L,
    config: TestConfig,
    clock: C,
    scheduler: Scheduler,
    phase: EnginePhase,
    stage: TrialStage,
    countdown_from: u8,
    countdown_remaining: u8,
    sequence: Vec<Trial>,
    responses: Vec<Response>,
    trial_index: usize,
    gate: ResponseGate,
    stimulus_onset: Option<f64>,
    wait_started: Option<f64>,
    active_timer: Option<TimerHandle>,
    last_feedback: Option<bool>,
    start_epoch: Option<i64>,
    result: Option<TaskResult>,
    on_complete: Option<CompletionCallback>,
}

impl<L: TaskLogic, C: Clock> TrialEngine<L, C> {
    /// Validate `config` and draw the trial sequence.
    ///
    /// Nothing is scheduled until [`begin`](Self::begin).
    pub fn new(
        logic: L,
        config: TestConfig,
        clock: C,
        rng: &mut dyn RngCore,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if config.test_type != logic.test_type() {
            return Err(ConfigError::TaskMismatch {
                expected: logic.test_type(),
                found: config.test_type,
            }
            .into());
        }

        let sequence = logic.generate_sequence(&config, rng);
        debug!(
            "{}: generated {} trials",
            config.test_type,
            sequence.len()
        );

        Ok(Self {
            logic,
            config,
            clock,
            scheduler: Scheduler::new(),
            phase: EnginePhase::Instructions,
            stage: TrialStage::Idle,
            countdown_from: DEFAULT_COUNTDOWN,
            countdown_remaining: DEFAULT_COUNTDOWN,
            sequence,
            responses: Vec::new(),
            trial_index: 0,
            gate: ResponseGate::new(),
            stimulus_onset: None,
            wait_started: None,
            active_timer: None,
            last_feedback: None,
            start_epoch: None,
            result: None,
            on_complete: None,
        })
    }

    /// Countdown start value; 0 starts trials right away
    pub fn with_countdown(mut self, from: u8) -> Self {
        self.countdown_from = from;
        self.countdown_remaining = from;
        self
    }

    /// Called once with the finished result
    pub fn with_completion(mut self, callback: impl FnMut(&TaskResult) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Start signal: leave the instructions screen
    pub fn begin(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.phase != EnginePhase::Instructions {
            trace!("begin ignored in {} phase", self.phase.name());
            return events;
        }

        let now = self.clock.now_ms();
        if self.countdown_from == 0 {
            self.start_test(now, &mut events);
        } else {
            self.set_phase(EnginePhase::Countdown, &mut events);
            self.countdown_remaining = self.countdown_from;
            events.push(EngineEvent::CountdownTick(self.countdown_remaining));
            self.schedule(TimerKind::Countdown, now, COUNTDOWN_STEP_MS);
        }
        events
    }

    /// Fire every timer that has come due
    pub fn tick(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        self.fire_due(self.clock.now_ms(), &mut events);
        events
    }

    /// Offer a participant input to the current trial.
    ///
    /// Timers due at or before `input.timestamp` fire first, so an input
    /// that arrives after its window closed finds the trial already timed
    /// out. Only the first input per trial counts. The response time is
    /// measured against `input.timestamp`, which must come from the engine's
    /// clock.
    pub fn handle_input(&mut self, mut input: InputEvent) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        self.fire_due(input.timestamp, &mut events);
        if self.phase != EnginePhase::Test || !input.has_response {
            return events;
        }

        let (reference, before_onset) = match self.stage {
            TrialStage::Stimulus => (self.stimulus_onset, false),
            TrialStage::PreStimulus => (self.wait_started, true),
            _ => {
                trace!("input outside a response window ignored");
                return events;
            }
        };
        if !self.gate.try_claim() {
            trace!("second response to trial {} ignored", self.trial_index);
            return events;
        }

        let index = self.trial_index;
        let Some(trial) = self.sequence.get(index) else {
            return events;
        };
        input.response_time = (input.timestamp - reference.unwrap_or(input.timestamp)).max(0.0);
        input.before_onset = before_onset;

        let correct = self.logic.validate_response(trial, &input);
        self.responses.push(Response {
            stimulus: trial.clone(),
            response_time: input.response_time,
            correct,
            timestamp: self.clock.epoch_at(input.timestamp),
            responded: true,
        });
        debug!(
            "{} trial {}: {} in {:.0} ms{}",
            self.config.test_type,
            index,
            if correct { "correct" } else { "incorrect" },
            input.response_time,
            if before_onset { " (false start)" } else { "" }
        );
        events.push(EngineEvent::ResponseRecorded {
            index,
            correct,
            response_time: input.response_time,
            before_onset,
        });

        if let Some(handle) = self.active_timer.take() {
            self.scheduler.cancel(handle);
        }
        self.gate.disarm();
        self.show_feedback(correct, input.timestamp, &mut events);
        events
    }

    /// Cancel every pending timer. A run that has not finished becomes
    /// [`EnginePhase::Aborted`] and produces no result.
    pub fn teardown(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        self.active_timer = None;
        self.gate.disarm();
        self.stage = TrialStage::Idle;
        if !self.phase.is_terminal() {
            info!(
                "{}: aborted at trial {}/{} ({} timers cancelled)",
                self.config.test_type,
                self.trial_index + 1,
                self.sequence.len(),
                cancelled
            );
            self.phase = EnginePhase::Aborted;
        }
    }

    /// Snapshot of what to draw
    pub fn display(&self) -> DisplayState<'_> {
        match self.phase {
            EnginePhase::Instructions => DisplayState::Instructions,
            EnginePhase::Countdown => DisplayState::Countdown(self.countdown_remaining),
            EnginePhase::Results => DisplayState::Done,
            EnginePhase::Aborted => DisplayState::Aborted,
            EnginePhase::Test => {
                let now = self.clock.now_ms();
                match self.stage {
                    TrialStage::PreStimulus => DisplayState::Waiting {
                        elapsed_ms: now - self.wait_started.unwrap_or(now),
                    },
                    TrialStage::Stimulus => match self.sequence.get(self.trial_index) {
                        Some(trial) => DisplayState::Stimulus {
                            trial,
                            elapsed_ms: now - self.stimulus_onset.unwrap_or(now),
                        },
                        None => DisplayState::Blank,
                    },
                    TrialStage::Feedback => DisplayState::Feedback {
                        correct: self.last_feedback.unwrap_or(false),
                    },
                    TrialStage::Idle | TrialStage::InterTrial => DisplayState::Blank,
                }
            }
        }
    }

    /// `(current trial, total)`, 1-based, while trials are running
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        if self.phase != EnginePhase::Test {
            return None;
        }
        let total = self.sequence.len();
        Some(((self.trial_index + 1).min(total), total))
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn stage(&self) -> TrialStage {
        self.stage
    }

    pub fn test_type(&self) -> TestType {
        self.config.test_type
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn sequence(&self) -> &[Trial] {
        &self.sequence
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn result(&self) -> Option<&TaskResult> {
        self.result.as_ref()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Earliest monotonic time at which `tick` has work to do
    pub fn next_deadline(&self) -> Option<f64> {
        self.scheduler.next_deadline()
    }

    fn set_phase(&mut self, phase: EnginePhase, events: &mut Vec<EngineEvent>) {
        if self.phase == phase {
            return;
        }
        info!(
            "{}: {} -> {}",
            self.config.test_type,
            self.phase.name(),
            phase.name()
        );
        self.phase = phase;
        events.push(EngineEvent::PhaseChanged(phase));
    }

    fn schedule(&mut self, kind: TimerKind, from_ms: f64, delay_ms: u64) {
        let handle = self.scheduler.schedule(kind, from_ms, delay_ms);
        self.active_timer = Some(handle);
    }

    /// Fire timers due at `now_ms` in order. Each one runs at its own due
    /// time, so a late tick does not stretch the trial timeline.
    fn fire_due(&mut self, now_ms: f64, events: &mut Vec<EngineEvent>) {
        while let Some((handle, kind, due_ms)) = self.scheduler.pop_due(now_ms) {
            if self.active_timer == Some(handle) {
                self.active_timer = None;
            }
            self.on_timer(kind, due_ms, events);
        }
    }

    fn on_timer(&mut self, kind: TimerKind, at: f64, events: &mut Vec<EngineEvent>) {
        match kind {
            TimerKind::Countdown if self.phase == EnginePhase::Countdown => {
                self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
                if self.countdown_remaining == 0 {
                    self.start_test(at, events);
                } else {
                    events.push(EngineEvent::CountdownTick(self.countdown_remaining));
                    self.schedule(TimerKind::Countdown, at, COUNTDOWN_STEP_MS);
                }
            }
            TimerKind::PreStimulus if self.stage == TrialStage::PreStimulus => {
                self.present_stimulus(at, events);
            }
            TimerKind::Stimulus if self.stage == TrialStage::Stimulus => {
                self.close_window(at, events);
            }
            TimerKind::Feedback if self.stage == TrialStage::Feedback => {
                self.advance(at, events)
            }
            TimerKind::InterTrial if self.stage == TrialStage::InterTrial => {
                self.start_trial(at, events);
            }
            other => trace!("stale {:?} timer ignored", other),
        }
    }

    fn start_test(&mut self, at: f64, events: &mut Vec<EngineEvent>) {
        self.start_epoch = Some(self.clock.epoch_at(at));
        self.trial_index = 0;
        self.set_phase(EnginePhase::Test, events);
        self.start_trial(at, events);
    }

    fn start_trial(&mut self, at: f64, events: &mut Vec<EngineEvent>) {
        let Some(wait) = self
            .sequence
            .get(self.trial_index)
            .map(Trial::pre_stimulus_wait_ms)
        else {
            self.finish(at, events);
            return;
        };

        let index = self.trial_index;
        debug!("{} trial {} started", self.config.test_type, index);
        events.push(EngineEvent::TrialStarted { index });
        self.gate.arm();
        self.last_feedback = None;
        self.stimulus_onset = None;

        match wait {
            Some(wait_ms) => {
                self.stage = TrialStage::PreStimulus;
                self.wait_started = Some(at);
                self.schedule(TimerKind::PreStimulus, at, wait_ms);
            }
            None => self.present_stimulus(at, events),
        }
    }

    fn present_stimulus(&mut self, at: f64, events: &mut Vec<EngineEvent>) {
        self.stage = TrialStage::Stimulus;
        self.stimulus_onset = Some(at);
        events.push(EngineEvent::StimulusOnset {
            index: self.trial_index,
        });
        self.schedule(TimerKind::Stimulus, at, self.config.stimulus_duration_ms);
    }

    /// Response window expired with no input
    fn close_window(&mut self, at: f64, events: &mut Vec<EngineEvent>) {
        if !self.gate.try_claim() {
            return;
        }
        let index = self.trial_index;
        let elapsed = at - self.stimulus_onset.unwrap_or(at);
        let recorded = self.config.record_misses_automatically;

        if recorded {
            if let Some(trial) = self.sequence.get(index) {
                let input = InputEvent::timeout(at).with_response_time(elapsed);
                let correct = self.logic.validate_response(trial, &input);
                self.responses.push(Response {
                    stimulus: trial.clone(),
                    response_time: elapsed,
                    correct,
                    timestamp: self.clock.epoch_at(at),
                    responded: false,
                });
            }
        }
        debug!(
            "{} trial {} timed out{}",
            self.config.test_type,
            index,
            if recorded { "" } else { " (not recorded)" }
        );
        events.push(EngineEvent::TimedOut { index, recorded });
        self.gate.disarm();
        self.advance(at, events);
    }

    fn show_feedback(&mut self, correct: bool, at: f64, events: &mut Vec<EngineEvent>) {
        self.last_feedback = Some(correct);
        if self.config.feedback_duration_ms == 0 {
            self.advance(at, events);
        } else {
            self.stage = TrialStage::Feedback;
            self.schedule(TimerKind::Feedback, at, self.config.feedback_duration_ms);
        }
    }

    fn advance(&mut self, at: f64, events: &mut Vec<EngineEvent>) {
        events.push(EngineEvent::TrialFinished {
            index: self.trial_index,
        });
        self.trial_index += 1;
        self.stimulus_onset = None;
        self.wait_started = None;

        if self.trial_index >= self.sequence.len() {
            self.finish(at, events);
        } else if self.config.inter_trial_interval_ms == 0 {
            self.start_trial(at, events);
        } else {
            self.stage = TrialStage::InterTrial;
            self.schedule(TimerKind::InterTrial, at, self.config.inter_trial_interval_ms);
        }
    }

    fn finish(&mut self, at: f64, events: &mut Vec<EngineEvent>) {
        let end = self.clock.epoch_at(at);
        let start = self.start_epoch.unwrap_or(end);
        let result = self
            .logic
            .calculate_results(&self.responses, &self.config, &self.sequence)
            .stamped(start, end);

        self.scheduler.cancel_all();
        self.active_timer = None;
        self.stage = TrialStage::Idle;
        self.gate.disarm();
        info!(
            "{}: complete, accuracy {:.1}%, mean RT {:.0} ms",
            self.config.test_type,
            result.accuracy * 100.0,
            result.average_reaction_time
        );
        self.set_phase(EnginePhase::Results, events);

        if let Some(callback) = self.on_complete.as_mut() {
            callback(&result);
        }
        self.result = Some(result.clone());
        events.push(EngineEvent::Completed(result));
    }
}

impl<L: TaskLogic, C: Clock> Drop for TrialEngine<L, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
