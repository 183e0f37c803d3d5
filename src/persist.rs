//! Result persistence contract and the sinks that implement it
//!
//! The session calls [`ResultSink::save_result`] once per completed task. A
//! failed save never discards the in-memory result: the session keeps it
//! as unsynced and the caller may replay it later.

use crate::tasks::TaskResult;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from writing results to disk
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of one save attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

impl From<Result<(), PersistError>> for SaveOutcome {
    fn from(result: Result<(), PersistError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

/// Where finished task results go
pub trait ResultSink {
    fn save_result(&mut self, session_id: &str, result: &TaskResult) -> SaveOutcome;
}

/// Accepts and drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn save_result(&mut self, _session_id: &str, _result: &TaskResult) -> SaveOutcome {
        SaveOutcome::ok()
    }
}

/// Keeps saved results in memory; can be told to fail
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub saved: Vec<(String, TaskResult)>,
    failure: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save fails with `message` until [`recover`](Self::recover)
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            saved: Vec::new(),
            failure: Some(message.into()),
        }
    }

    pub fn recover(&mut self) {
        self.failure = None;
    }
}

impl ResultSink for MemorySink {
    fn save_result(&mut self, session_id: &str, result: &TaskResult) -> SaveOutcome {
        if let Some(message) = &self.failure {
            return SaveOutcome::failed(message.clone());
        }
        self.saved.push((session_id.to_string(), result.clone()));
        SaveOutcome::ok()
    }
}

/// Writes each result as `<session>-<testType>.json` in a directory
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a result for this session would be written to
    pub fn path_for(&self, session_id: &str, result: &TaskResult) -> PathBuf {
        self.dir
            .join(format!("{}-{}.json", session_id, result.test_type().id()))
    }

    fn write(&self, session_id: &str, result: &TaskResult) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(session_id, result);
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&path, json)?;
        debug!("wrote {}", path.display());
        Ok(())
    }
}

impl ResultSink for JsonDirSink {
    fn save_result(&mut self, session_id: &str, result: &TaskResult) -> SaveOutcome {
        self.write(session_id, result).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{SartMetrics, TaskMetrics};
    use std::env;

    fn result() -> TaskResult {
        TaskResult::new(0.9, 350.0, &[], TaskMetrics::Sart(SartMetrics::default()))
            .stamped(1_000, 2_000)
    }

    #[test]
    fn memory_sink_keeps_results() {
        let mut sink = MemorySink::new();
        assert_eq!(sink.save_result("s1", &result()), SaveOutcome::ok());
        assert_eq!(sink.saved.len(), 1);
        assert_eq!(sink.saved[0].0, "s1");
    }

    #[test]
    fn failing_sink_reports_error_until_recovered() {
        let mut sink = MemorySink::failing("offline");
        let outcome = sink.save_result("s1", &result());
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("offline"));
        assert!(sink.saved.is_empty());

        sink.recover();
        assert!(sink.save_result("s1", &result()).success);
    }

    #[test]
    fn json_dir_sink_writes_wire_shape() {
        let dir = env::temp_dir().join(format!("cognitive-battery-sink-{}", std::process::id()));
        let mut sink = JsonDirSink::new(&dir);
        let result = result();

        assert!(sink.save_result("abc", &result).success);
        let path = sink.path_for("abc", &result);
        assert!(path.ends_with("abc-sart.json"));

        let text = fs::read_to_string(&path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["testType"], "sart");
        assert_eq!(value["duration"], 1000);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn json_dir_sink_reports_io_failure() {
        // A regular file cannot be used as the results directory
        let file = env::temp_dir().join(format!("cognitive-battery-notadir-{}", std::process::id()));
        fs::write(&file, "x").expect("create file");
        let mut sink = JsonDirSink::new(&file);

        let outcome = sink.save_result("abc", &result());
        assert!(!outcome.success);
        assert!(outcome.error.is_some());

        fs::remove_file(&file).ok();
    }
}
