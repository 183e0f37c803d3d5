//! Main application state and logic

use super::ThemeColors;
use crate::config::{Config, ConfigError};
use crate::input::InputEvent;
use crate::persist::ResultSink;
use crate::report::SessionReport;
use crate::session::{SessionEvent, SessionOrchestrator, SessionPhase};
use crate::tasks::{TaskResult, TestType};
use crate::timing::{Clock, MonotonicClock};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// How long a status message stays visible
const STATUS_TTL_MS: f64 = 3000.0;

/// Application running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Quitting,
}

/// Main application
pub struct App<C: Clock + Clone = MonotonicClock> {
    /// Application state
    pub state: AppState,
    /// Palette picked from the config
    pub colors: ThemeColors,
    /// Inputs forwarded to the battery
    pub total_inputs: u64,
    orchestrator: SessionOrchestrator<C>,
    export_on_finish: bool,
    report_dir: Option<PathBuf>,
    /// Where the finished session's report was written, if anywhere
    exported: Option<PathBuf>,
    status_message: Option<String>,
    status_time: Option<f64>,
}

impl<C: Clock + Clone> App<C> {
    pub fn new(config: Config, clock: C) -> Result<Self, ConfigError> {
        let colors = ThemeColors::from_theme(config.ui.theme);
        let export_on_finish = config.output.export_report;
        let report_dir = config.output.results_dir.clone();
        Ok(Self {
            state: AppState::Running,
            colors,
            total_inputs: 0,
            orchestrator: SessionOrchestrator::new(config, clock)?,
            export_on_finish,
            report_dir,
            exported: None,
            status_message: None,
            status_time: None,
        })
    }

    /// Send finished task results to `sink`
    pub fn with_sink(mut self, sink: impl ResultSink + 'static) -> Self {
        self.orchestrator.set_sink(sink);
        self
    }

    /// Start the battery, or leave the current task's instructions screen
    pub fn start(&mut self) {
        let events = match self.orchestrator.phase() {
            SessionPhase::Intro => self.orchestrator.start(),
            SessionPhase::Running(_) if self.orchestrator.awaiting_start() => {
                self.orchestrator.begin_task()
            }
            _ => return,
        };
        self.handle_events(events);
    }

    /// Forward a participant input to the running task
    pub fn process_input(&mut self, input: InputEvent) {
        if self.state != AppState::Running {
            return;
        }
        if !matches!(self.orchestrator.phase(), SessionPhase::Running(_)) {
            return;
        }
        self.total_inputs += 1;
        let events = self.orchestrator.handle_input(input);
        self.handle_events(events);
    }

    /// Fire due timers
    pub fn tick(&mut self) {
        let events = self.orchestrator.tick();
        self.handle_events(events);
    }

    /// Abandon the session if it is still in progress
    pub fn abort(&mut self) {
        let events = self.orchestrator.abort();
        self.handle_events(events);
    }

    /// Request quit. An unfinished session is abandoned first.
    pub fn quit(&mut self) {
        self.abort();
        self.state = AppState::Quitting;
    }

    pub fn orchestrator(&self) -> &SessionOrchestrator<C> {
        &self.orchestrator
    }

    pub fn phase(&self) -> SessionPhase {
        self.orchestrator.phase()
    }

    /// Reading of the battery clock, for stamping input
    pub fn now_ms(&self) -> f64 {
        self.orchestrator.now_ms()
    }

    /// Task shown in the header, if any
    pub fn current_task(&self) -> Option<TestType> {
        match self.phase() {
            SessionPhase::Running(test_type) => Some(test_type),
            SessionPhase::Transition { next } => Some(next),
            _ => None,
        }
    }

    /// Results recorded so far, in task order
    pub fn results(&self) -> &[TaskResult] {
        self.orchestrator
            .session()
            .map(|s| s.results.as_slice())
            .unwrap_or(&[])
    }

    pub fn exported_report(&self) -> Option<&Path> {
        self.exported.as_deref()
    }

    /// Short state label for the status bar
    pub fn state_label(&self) -> &'static str {
        match self.phase() {
            SessionPhase::Intro => "READY",
            SessionPhase::Running(_) if self.orchestrator.awaiting_start() => "WAITING",
            SessionPhase::Running(_) => "RUNNING",
            SessionPhase::Transition { .. } => "NEXT",
            SessionPhase::Summary => "DONE",
            SessionPhase::Abandoned => "ABANDONED",
        }
    }

    /// Name of the current screen
    pub fn view_name(&self) -> &'static str {
        match self.phase() {
            SessionPhase::Intro => "Intro",
            SessionPhase::Running(test_type) => test_type.name(),
            SessionPhase::Transition { .. } => "Transition",
            SessionPhase::Summary => "Summary",
            SessionPhase::Abandoned => "Abandoned",
        }
    }

    /// Set a status message
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_time = Some(self.now_ms());
    }

    /// Get status message if still valid (within 3 seconds)
    pub fn get_status(&self) -> Option<&str> {
        match (&self.status_message, self.status_time) {
            (Some(msg), Some(time)) if self.now_ms() - time < STATUS_TTL_MS => Some(msg),
            _ => None,
        }
    }

    /// Battery clock as mm:ss, zero until a session exists
    pub fn elapsed_formatted(&self) -> String {
        let secs = match self.orchestrator.session() {
            Some(_) => (self.now_ms() / 1000.0) as u64,
            None => 0,
        };
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    /// Generate a report for the current session
    pub fn generate_report(&self) -> Option<SessionReport> {
        self.orchestrator.session().map(SessionReport::from_session)
    }

    /// Export session report to a JSON file
    pub fn export_report(&mut self, filename: &str) -> Result<String, std::io::Error> {
        let Some(report) = self.generate_report() else {
            self.set_status("Nothing to export yet".to_string());
            return Ok(String::new());
        };
        let path = Path::new(filename);
        report.export_json(path)?;
        let msg = format!("Exported to {}", filename);
        self.set_status(msg.clone());
        Ok(msg)
    }

    fn handle_events(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::PersistWarning { test_type, error } => {
                    self.set_status(format!("{} result not saved: {}", test_type.name(), error));
                }
                SessionEvent::PhaseChanged(SessionPhase::Abandoned) => {
                    self.set_status("Session abandoned".to_string());
                }
                SessionEvent::Finished(summary) => {
                    self.set_status(format!("Battery complete: score {}/100", summary.score));
                    if self.export_on_finish {
                        self.export_finished();
                    }
                }
                _ => {}
            }
        }
    }

    fn export_finished(&mut self) {
        let filename = format!(
            "battery_report_{}.json",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = match &self.report_dir {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("could not create {}: {}", parent.display(), e);
            }
        }
        match self.export_report(&path.to_string_lossy()) {
            Ok(_) => {
                info!("report written to {}", path.display());
                self.exported = Some(path);
            }
            Err(e) => {
                warn!("report export failed: {}", e);
                self.set_status(format!("Report export failed: {}", e));
            }
        }
    }
}
