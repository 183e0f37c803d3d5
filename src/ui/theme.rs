//! Theme color definitions for the UI
//!
//! Provides dark and light color palettes selected from the config.

use crate::config::Theme;
use crate::tasks::MetricStatus;
use ratatui::style::Color;

/// Complete color palette for the UI
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    /// Main background
    pub bg: Color,
    /// Primary foreground text
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (headings, current task)
    pub cyan: Color,
    /// Success / correct
    pub green: Color,
    /// Warning status
    pub yellow: Color,
    /// Error / incorrect
    pub red: Color,
    /// Stimulus panel background
    pub panel: Color,
    /// Stimulus glyphs
    pub stimulus: Color,
    /// Running PVT counter
    pub counter: Color,
    /// Unfilled part of profile bars
    pub bar_empty: Color,
    /// Filled part of profile bars
    pub bar_fill: Color,
}

impl ThemeColors {
    /// Create a color palette for the given theme variant
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(22, 22, 30),
            fg: Color::Rgb(200, 200, 210),
            dim: Color::Rgb(90, 90, 110),
            cyan: Color::Rgb(80, 200, 220),
            green: Color::Rgb(80, 200, 120),
            yellow: Color::Rgb(240, 180, 80),
            red: Color::Rgb(240, 90, 100),
            panel: Color::Rgb(30, 30, 40),
            stimulus: Color::Rgb(235, 235, 245),
            counter: Color::Rgb(240, 180, 80),
            bar_empty: Color::Rgb(55, 55, 70),
            bar_fill: Color::Rgb(80, 200, 220),
        }
    }

    /// High contrast for bright terminals
    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(245, 245, 248),
            fg: Color::Rgb(30, 30, 40),
            dim: Color::Rgb(130, 130, 150),
            cyan: Color::Rgb(0, 130, 160),
            green: Color::Rgb(30, 150, 70),
            yellow: Color::Rgb(180, 120, 0),
            red: Color::Rgb(200, 50, 60),
            panel: Color::Rgb(232, 232, 238),
            stimulus: Color::Rgb(20, 20, 25),
            counter: Color::Rgb(180, 120, 0),
            bar_empty: Color::Rgb(210, 210, 220),
            bar_fill: Color::Rgb(0, 130, 160),
        }
    }

    /// Color for a metric line's status
    pub fn status(&self, status: MetricStatus) -> Color {
        match status {
            MetricStatus::Ok => self.green,
            MetricStatus::Warning => self.yellow,
            MetricStatus::Error => self.red,
            MetricStatus::Info => self.cyan,
        }
    }

    /// Feedback flash color
    pub fn feedback(&self, correct: bool) -> Color {
        if correct {
            self.green
        } else {
            self.red
        }
    }
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self::dark()
    }
}
