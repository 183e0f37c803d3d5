//! Session report and export functionality

use crate::session::{AbilityProfile, Session, SessionSummary};
use crate::tasks::{MetricLine, MetricStatus, TaskResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete session report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: ReportSummary,
    /// One section per completed task, in administration order
    pub tasks: Vec<TaskReport>,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report generation timestamp
    pub generated_at: String,
    /// Application version
    pub version: String,
    pub session_id: String,
    /// Session start, RFC 3339
    pub started_at: String,
    /// Session duration in seconds, once finalized
    pub duration_secs: Option<f64>,
}

/// Session summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub completed_tests: usize,
    /// All four tasks done and the session finalized
    pub finished: bool,
    /// Aggregate 0-100 score, only for finished sessions
    pub score: Option<u8>,
    pub mean_accuracy: Option<f64>,
    pub mean_reaction_time_ms: Option<f64>,
    pub profile: Option<AbilityProfile>,
    /// Number of metric lines flagged warning or error
    pub issues_detected: u32,
}

/// Metrics for one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub test_type: String,
    pub name: String,
    pub ability: String,
    pub entries: Vec<ResultEntry>,
}

/// Single result entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    pub label: String,
    pub value: String,
    pub status: String,
}

impl From<&MetricLine> for ResultEntry {
    fn from(line: &MetricLine) -> Self {
        Self {
            label: line.label.clone(),
            value: line.value.clone(),
            status: line.status.as_str().to_string(),
        }
    }
}

impl TaskReport {
    fn from_result(result: &TaskResult) -> Self {
        let test_type = result.test_type();
        Self {
            test_type: test_type.id().to_string(),
            name: test_type.name().to_string(),
            ability: test_type.ability().to_string(),
            entries: result.summary_lines().iter().map(ResultEntry::from).collect(),
        }
    }
}

fn rfc3339(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

impl SessionReport {
    /// Build a report for a session, finished or not.
    ///
    /// The summary is recomputed from the session's results only when the
    /// session is finalized; abandoned sessions report per-task metrics alone.
    pub fn from_session(session: &Session) -> Self {
        let now: DateTime<Utc> = Utc::now();
        let tasks: Vec<TaskReport> = session.results.iter().map(TaskReport::from_result).collect();

        let issues_detected = session
            .results
            .iter()
            .flat_map(|r| r.summary_lines())
            .filter(|line| matches!(line.status, MetricStatus::Warning | MetricStatus::Error))
            .count() as u32;

        let summary = session
            .is_finalized()
            .then(|| SessionSummary::from_results(&session.results));

        Self {
            metadata: ReportMetadata {
                generated_at: now.to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                session_id: session.id.clone(),
                started_at: rfc3339(session.start_time),
                duration_secs: session.duration_ms().map(|ms| ms as f64 / 1000.0),
            },
            summary: ReportSummary {
                completed_tests: session.completed_tests.len(),
                finished: session.is_finalized(),
                score: summary.as_ref().map(|s| s.score),
                mean_accuracy: summary.as_ref().map(|s| s.mean_accuracy),
                mean_reaction_time_ms: summary.as_ref().map(|s| s.mean_reaction_time),
                profile: summary.map(|s| s.profile),
                issues_detected,
            },
            tasks,
        }
    }

    /// Export report to JSON file
    pub fn export_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Export report to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text rendering for terminals and logs
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Cognitive Battery Report v{}", self.metadata.version);
        let _ = writeln!(out, "Session:   {}", self.metadata.session_id);
        let _ = writeln!(out, "Started:   {}", self.metadata.started_at);
        match self.metadata.duration_secs {
            Some(secs) => {
                let _ = writeln!(out, "Duration:  {:.1}s", secs);
            }
            None => {
                let _ = writeln!(
                    out,
                    "Status:    incomplete ({}/4 tasks)",
                    self.summary.completed_tests
                );
            }
        }

        if let Some(score) = self.summary.score {
            let _ = writeln!(out, "\nScore: {}/100", score);
            if let Some(profile) = &self.summary.profile {
                for (ability, value) in profile.axes() {
                    let _ = writeln!(out, "  {:<22} {:>5.1}%", ability, value * 100.0);
                }
            }
        }

        for task in &self.tasks {
            let _ = writeln!(out, "\n[{}] {}", task.name, task.ability);
            for entry in &task.entries {
                let _ = writeln!(out, "  {:<20} {:>14}  {}", entry.label, entry.value, entry.status);
            }
        }
        out
    }
}
