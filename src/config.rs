//! Configuration management for the battery
//!
//! Provides persistent configuration that is loaded from and saved to a
//! platform-specific config file.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/cognitive-battery/config.toml` |
//! | macOS | `~/Library/Application Support/cognitive-battery/config.toml` |
//! | Windows | `%APPDATA%\cognitive-battery\config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use cognitive_battery::Config;
//!
//! // Load existing config or use defaults
//! let mut config = Config::load().unwrap_or_default();
//!
//! // Shorten the vigilance task
//! config.pvt.total_trials = 10;
//!
//! // Save to disk
//! config.save().expect("Failed to save config");
//! ```

use crate::tasks::TestType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Longest duration any single timer may be configured for
pub const MAX_DURATION_MS: u64 = 60_000;

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A task was configured with no trials
    #[error("{test_type}: total_trials must be greater than zero")]
    InvalidTrials { test_type: TestType },
    /// A duration is zero where it must not be, or absurdly long
    #[error("{test_type}: invalid {field} ({value} ms)")]
    InvalidDuration {
        test_type: TestType,
        field: &'static str,
        value: u64,
    },
    /// A task config was handed to the logic of a different task
    #[error("config for {found} cannot drive the {expected} task")]
    TaskMismatch {
        expected: TestType,
        found: TestType,
    },
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join("cognitive-battery");

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

fn default_true() -> bool {
    true
}

/// Immutable per-task run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Which task this config drives
    pub test_type: TestType,
    /// Number of trials in the sequence
    pub total_trials: usize,
    /// Response window after stimulus onset
    pub stimulus_duration_ms: u64,
    /// Feedback flash after a response (0 disables)
    pub feedback_duration_ms: u64,
    /// Blank gap between trials (0 disables)
    pub inter_trial_interval_ms: u64,
    /// Record a timeout response when the window closes without input
    #[serde(default = "default_true")]
    pub record_misses_automatically: bool,
}

impl TestConfig {
    /// Default parameters for a task
    pub fn for_task(test_type: TestType) -> Self {
        match test_type {
            TestType::Sart => Self {
                test_type,
                total_trials: 45,
                stimulus_duration_ms: 1000,
                feedback_duration_ms: 200,
                inter_trial_interval_ms: 500,
                record_misses_automatically: true,
            },
            TestType::Flanker => Self {
                test_type,
                total_trials: 40,
                stimulus_duration_ms: 2000,
                feedback_duration_ms: 300,
                inter_trial_interval_ms: 500,
                record_misses_automatically: true,
            },
            // Withholding on a non-target is the correct answer, so a silent
            // window must not turn into a recorded miss.
            TestType::NBack => Self {
                test_type,
                total_trials: 30,
                stimulus_duration_ms: 2000,
                feedback_duration_ms: 200,
                inter_trial_interval_ms: 500,
                record_misses_automatically: false,
            },
            TestType::Pvt => Self {
                test_type,
                total_trials: 20,
                stimulus_duration_ms: 3000,
                feedback_duration_ms: 500,
                inter_trial_interval_ms: 500,
                record_misses_automatically: true,
            },
        }
    }

    pub fn with_trials(mut self, total_trials: usize) -> Self {
        self.total_trials = total_trials;
        self
    }

    /// Fail fast on values that would break a run before any timer starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        let test_type = self.test_type;
        if self.total_trials == 0 {
            return Err(ConfigError::InvalidTrials { test_type });
        }
        if self.stimulus_duration_ms == 0 {
            return Err(ConfigError::InvalidDuration {
                test_type,
                field: "stimulus_duration_ms",
                value: 0,
            });
        }
        for (field, value) in [
            ("stimulus_duration_ms", self.stimulus_duration_ms),
            ("feedback_duration_ms", self.feedback_duration_ms),
            ("inter_trial_interval_ms", self.inter_trial_interval_ms),
        ] {
            if value > MAX_DURATION_MS {
                return Err(ConfigError::InvalidDuration {
                    test_type,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

fn default_sart() -> TestConfig {
    TestConfig::for_task(TestType::Sart)
}

fn default_flanker() -> TestConfig {
    TestConfig::for_task(TestType::Flanker)
}

fn default_nback() -> TestConfig {
    TestConfig::for_task(TestType::NBack)
}

fn default_pvt() -> TestConfig {
    TestConfig::for_task(TestType::Pvt)
}

/// Session-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// Pause between tasks for the "next up" screen
    pub transition_delay_ms: u64,
    /// Countdown start value before each task (0 skips the countdown)
    pub countdown_from: u8,
    /// Fixed RNG seed for reproducible sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            transition_delay_ms: 2000,
            countdown_from: 3,
            seed: None,
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Refresh rate for UI updates (in Hz)
    pub refresh_rate_hz: u32,
    /// Color theme (dark/light)
    pub theme: Theme,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 120,
            theme: Theme::Dark,
        }
    }
}

/// Color theme options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

/// Where results go once a task completes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for per-task JSON results (none keeps results in memory only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
    /// Write a session report when the battery finishes
    #[serde(default)]
    pub export_report: bool,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Session settings
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Sustained attention (go/no-go)
    #[serde(default = "default_sart")]
    pub sart: TestConfig,
    /// Flanker conflict
    #[serde(default = "default_flanker")]
    pub flanker: TestConfig,
    /// 2-back working memory
    #[serde(default = "default_nback")]
    pub nback: TestConfig,
    /// Psychomotor vigilance
    #[serde(default = "default_pvt")]
    pub pvt: TestConfig,
    /// UI settings
    #[serde(default)]
    pub ui: UiConfig,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            battery: BatteryConfig::default(),
            sart: TestConfig::for_task(TestType::Sart),
            flanker: TestConfig::for_task(TestType::Flanker),
            nback: TestConfig::for_task(TestType::NBack),
            pvt: TestConfig::for_task(TestType::Pvt),
            ui: UiConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Task config by type
    pub fn test_config(&self, test_type: TestType) -> &TestConfig {
        match test_type {
            TestType::Sart => &self.sart,
            TestType::Flanker => &self.flanker,
            TestType::NBack => &self.nback,
            TestType::Pvt => &self.pvt,
        }
    }

    /// Validate every task config and that each sits in its own slot
    pub fn validate(&self) -> Result<(), ConfigError> {
        for test_type in TestType::ORDER {
            let config = self.test_config(test_type);
            if config.test_type != test_type {
                return Err(ConfigError::TaskMismatch {
                    expected: test_type,
                    found: config.test_type,
                });
            }
            config.validate()?;
        }
        if self.battery.transition_delay_ms > MAX_DURATION_MS {
            return Err(ConfigError::InvalidDuration {
                test_type: TestType::Sart,
                field: "transition_delay_ms",
                value: self.battery.transition_delay_ms,
            });
        }
        Ok(())
    }

    /// Get UI refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.ui.refresh_rate_hz.max(1)))
    }
}
