//! Custom TUI widgets

use super::ThemeColors;
use crate::engine::DisplayState;
use crate::session::{Session, SessionSummary};
use crate::tasks::{MetricLine, MetricStatus, TestType, Trial};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Write `text` horizontally centered on row `y` of `area`
fn centered(buf: &mut Buffer, area: Rect, y: u16, text: &str, style: Style) {
    if y >= area.y + area.height {
        return;
    }
    let width = text.chars().count() as u16;
    let x = area.x + area.width.saturating_sub(width) / 2;
    buf.set_stringn(x, y, text, area.width as usize, style);
}

/// Participant-facing instructions for each task
pub fn instructions(test_type: TestType) -> &'static [&'static str] {
    match test_type {
        TestType::Sart => &[
            "Digits from 0 to 9 will appear one at a time.",
            "Press SPACE for every digit except 3.",
            "When you see a 3, do nothing.",
        ],
        TestType::Flanker => &[
            "A row of five arrows will appear.",
            "Respond to the direction of the MIDDLE arrow only.",
            "Left: \u{2190} or f      Right: \u{2192} or j",
        ],
        TestType::NBack => &[
            "Letters will appear one at a time.",
            "Press SPACE when the letter matches the one shown two letters ago.",
            "Otherwise, do nothing.",
        ],
        TestType::Pvt => &[
            "Watch the empty box.",
            "When the counter starts running, press SPACE as fast as you can.",
            "Do not press before the counter appears.",
        ],
    }
}

/// Widget for displaying a task's metric lines
pub struct ResultsPanel<'a> {
    lines: &'a [MetricLine],
    title: &'a str,
    colors: ThemeColors,
}

impl<'a> ResultsPanel<'a> {
    pub fn new(lines: &'a [MetricLine], title: &'a str, colors: ThemeColors) -> Self {
        Self {
            lines,
            title,
            colors,
        }
    }

    fn status_symbol(status: MetricStatus) -> &'static str {
        match status {
            MetricStatus::Ok => "[OK]",
            MetricStatus::Warning => "[!!]",
            MetricStatus::Error => "[XX]",
            MetricStatus::Info => "[--]",
        }
    }
}

impl<'a> Widget for ResultsPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.dim));

        let inner = block.inner(area);
        block.render(area, buf);

        for (y, result) in (inner.y..inner.y + inner.height).zip(self.lines) {
            let color = self.colors.status(result.status);
            let line = Line::from(vec![
                Span::styled(
                    format!("{} ", Self::status_symbol(result.status)),
                    Style::default().fg(color),
                ),
                Span::styled(
                    format!("{}: ", result.label),
                    Style::default()
                        .fg(self.colors.fg)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(&result.value, Style::default().fg(color)),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}

/// Welcome screen listing the tasks and the controls
pub struct IntroPanel {
    colors: ThemeColors,
}

impl IntroPanel {
    pub fn new(colors: ThemeColors) -> Self {
        Self { colors }
    }
}

impl Widget for IntroPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title("Cognitive Battery")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.cyan));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut text = vec![
            String::new(),
            " TASKS".to_string(),
            " -----------".to_string(),
        ];
        for test_type in TestType::ORDER {
            text.push(format!(
                " {}. {:<10}: {}",
                test_type.index() + 1,
                test_type.name(),
                test_type.ability()
            ));
        }
        text.extend(
            [
                "",
                " CONTROLS",
                " -----------",
                " s                : Start the battery / start the next task",
                " Space / Enter    : Respond",
                " \u{2190} \u{2192} / f j          : Respond left / right",
                " Mouse click      : Respond on that side of the screen",
                " e                : Export report to JSON",
                " q / Esc          : Abort and quit",
                "",
                " Press s to begin.",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        for (i, line) in text.iter().enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            let style = if line.contains("---") {
                Style::default().fg(self.colors.dim)
            } else if line.starts_with(' ')
                && line[1..].chars().all(|c| c.is_ascii_uppercase())
                && line.len() > 1
            {
                Style::default()
                    .fg(self.colors.yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg)
            };
            buf.set_stringn(inner.x, inner.y + i as u16, line, inner.width as usize, style);
        }
    }
}

/// Instructions for the task that is about to start
pub struct InstructionsPanel {
    test_type: TestType,
    colors: ThemeColors,
}

impl InstructionsPanel {
    pub fn new(test_type: TestType, colors: ThemeColors) -> Self {
        Self { test_type, colors }
    }
}

impl Widget for InstructionsPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(
            "{} - {}",
            self.test_type.name(),
            self.test_type.ability()
        );
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.cyan));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = instructions(self.test_type);
        let top = inner.y + inner.height.saturating_sub(lines.len() as u16 + 2) / 2;
        for (i, line) in lines.iter().enumerate() {
            centered(buf, inner, top + i as u16, line, Style::default().fg(self.colors.fg));
        }
        centered(
            buf,
            inner,
            top + lines.len() as u16 + 1,
            "Press s when ready",
            Style::default()
                .fg(self.colors.yellow)
                .add_modifier(Modifier::BOLD),
        );
    }
}

/// The stimulus area of a running task
pub struct StimulusPanel<'a> {
    display: DisplayState<'a>,
    colors: ThemeColors,
}

impl<'a> StimulusPanel<'a> {
    pub fn new(display: DisplayState<'a>, colors: ThemeColors) -> Self {
        Self { display, colors }
    }

    fn stimulus_text(trial: &Trial, elapsed_ms: f64) -> String {
        match trial {
            Trial::Sart(t) => t.number.to_string(),
            Trial::Flanker(t) => t
                .arrows
                .chars()
                .map(String::from)
                .collect::<Vec<_>>()
                .join(" "),
            Trial::NBack(t) => t.letter.to_string(),
            Trial::Pvt(_) => format!("{:>4.0} ms", elapsed_ms),
        }
    }
}

impl<'a> Widget for StimulusPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.dim))
            .style(Style::default().bg(self.colors.panel));
        let inner = block.inner(area);
        block.render(area, buf);

        let mid = inner.y + inner.height / 2;
        let bold = Modifier::BOLD;
        let (text, style) = match &self.display {
            DisplayState::Instructions => (
                "Press s to start".to_string(),
                Style::default().fg(self.colors.yellow),
            ),
            DisplayState::Countdown(0) => (
                "Go".to_string(),
                Style::default().fg(self.colors.green).add_modifier(bold),
            ),
            DisplayState::Countdown(n) => (
                n.to_string(),
                Style::default().fg(self.colors.cyan).add_modifier(bold),
            ),
            DisplayState::Blank => ("+".to_string(), Style::default().fg(self.colors.dim)),
            DisplayState::Waiting { .. } => {
                ("[      ]".to_string(), Style::default().fg(self.colors.dim))
            }
            DisplayState::Stimulus { trial, elapsed_ms } => {
                let color = match trial {
                    Trial::Pvt(_) => self.colors.counter,
                    _ => self.colors.stimulus,
                };
                (
                    Self::stimulus_text(trial, *elapsed_ms),
                    Style::default().fg(color).add_modifier(bold),
                )
            }
            DisplayState::Feedback { correct } => (
                if *correct { "Correct" } else { "Incorrect" }.to_string(),
                Style::default()
                    .fg(self.colors.feedback(*correct))
                    .add_modifier(bold),
            ),
            DisplayState::Done => ("Done".to_string(), Style::default().fg(self.colors.green)),
            DisplayState::Aborted => ("Stopped".to_string(), Style::default().fg(self.colors.red)),
        };
        centered(buf, inner, mid, &text, style);
    }
}

/// "Next up" pause between tasks
pub struct TransitionPanel {
    next: TestType,
    remaining_ms: f64,
    colors: ThemeColors,
}

impl TransitionPanel {
    pub fn new(next: TestType, remaining_ms: f64, colors: ThemeColors) -> Self {
        Self {
            next,
            remaining_ms,
            colors,
        }
    }
}

impl Widget for TransitionPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.dim));
        let inner = block.inner(area);
        block.render(area, buf);

        let mid = inner.y + inner.height / 2;
        centered(
            buf,
            inner,
            mid.saturating_sub(1),
            "Next up",
            Style::default().fg(self.colors.dim),
        );
        centered(
            buf,
            inner,
            mid,
            &format!("{} ({})", self.next.name(), self.next.ability()),
            Style::default()
                .fg(self.colors.cyan)
                .add_modifier(Modifier::BOLD),
        );
        centered(
            buf,
            inner,
            mid + 1,
            &format!("{:.1}s", self.remaining_ms / 1000.0),
            Style::default().fg(self.colors.fg),
        );
    }
}

/// Aggregate score and ability profile
pub struct SummaryPanel<'a> {
    summary: &'a SessionSummary,
    colors: ThemeColors,
}

impl<'a> SummaryPanel<'a> {
    pub fn new(summary: &'a SessionSummary, colors: ThemeColors) -> Self {
        Self { summary, colors }
    }
}

impl<'a> Widget for SummaryPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title("Summary")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.cyan));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 {
            return;
        }

        let header = Line::from(vec![
            Span::styled(
                format!(" Score {:>3}/100", self.summary.score),
                Style::default()
                    .fg(self.colors.cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    "   accuracy {:.1}%   mean RT {:.0} ms",
                    self.summary.mean_accuracy * 100.0,
                    self.summary.mean_reaction_time
                ),
                Style::default().fg(self.colors.fg),
            ),
        ]);
        buf.set_line(inner.x, inner.y, &header, inner.width);

        let label_width = 22u16;
        let bar_width = inner.width.saturating_sub(label_width + 10);
        for (i, (ability, value)) in self.summary.profile.axes().iter().enumerate() {
            let y = inner.y + 2 + i as u16;
            if y >= inner.y + inner.height {
                break;
            }
            buf.set_string(
                inner.x + 1,
                y,
                format!("{:<21}", ability),
                Style::default().fg(self.colors.fg),
            );
            let filled = (value.clamp(0.0, 1.0) * f64::from(bar_width)).round() as u16;
            for dx in 0..bar_width {
                let color = if dx < filled {
                    self.colors.bar_fill
                } else {
                    self.colors.bar_empty
                };
                buf.set_string(inner.x + label_width + dx, y, " ", Style::default().bg(color));
            }
            buf.set_string(
                inner.x + label_width + bar_width + 1,
                y,
                format!("{:>5.1}%", value * 100.0),
                Style::default().fg(self.colors.fg),
            );
        }
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    state: &'a str,
    view: &'a str,
    elapsed: &'a str,
    inputs: u64,
    message: Option<&'a str>,
    colors: ThemeColors,
}

impl<'a> StatusBar<'a> {
    pub fn new(
        state: &'a str,
        view: &'a str,
        elapsed: &'a str,
        inputs: u64,
        colors: ThemeColors,
    ) -> Self {
        Self {
            state,
            view,
            elapsed,
            inputs,
            message: None,
            colors,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg_style = Style::default().bg(self.colors.bar_empty).fg(self.colors.fg);
        for x in area.x..area.x + area.width {
            buf.set_string(x, area.y, " ", bg_style);
        }

        let left = format!(" {} | {} ", self.state, self.view);
        buf.set_string(area.x, area.y, &left, bg_style.add_modifier(Modifier::BOLD));

        if let Some(msg) = self.message {
            let msg_style = bg_style.fg(self.colors.yellow);
            let msg_x = area.x + (area.width / 2).saturating_sub(msg.len() as u16 / 2);
            buf.set_string(msg_x, area.y, msg, msg_style);
        }

        let right = format!(" {} | Inputs: {} ", self.elapsed, self.inputs);
        let right_x = area.x + area.width.saturating_sub(right.len() as u16);
        buf.set_string(right_x, area.y, &right, bg_style);
    }
}

/// Task progress strip: done, current and upcoming tasks
pub struct TaskBar<'a> {
    session: Option<&'a Session>,
    current: Option<TestType>,
    trial: Option<(usize, usize)>,
    colors: ThemeColors,
}

impl<'a> TaskBar<'a> {
    pub fn new(session: Option<&'a Session>, current: Option<TestType>, colors: ThemeColors) -> Self {
        Self {
            session,
            current,
            trial: None,
            colors,
        }
    }

    /// Show "trial i/n" next to the current task
    pub fn trial(mut self, progress: Option<(usize, usize)>) -> Self {
        self.trial = progress;
        self
    }
}

impl<'a> Widget for TaskBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut x = area.x;
        let end = area.x + area.width;

        for (i, test_type) in TestType::ORDER.iter().enumerate() {
            let done = self
                .session
                .is_some_and(|s| s.completed_tests.contains(test_type));
            let is_current = self.current == Some(*test_type);

            let style = if is_current {
                Style::default()
                    .fg(self.colors.bg)
                    .bg(self.colors.cyan)
                    .add_modifier(Modifier::BOLD)
            } else if done {
                Style::default().fg(self.colors.green).bg(self.colors.bar_empty)
            } else {
                Style::default().fg(self.colors.dim).bg(self.colors.bar_empty)
            };

            let mark = if done { "\u{2713} " } else { "" };
            let label = match (is_current, self.trial) {
                (true, Some((n, total))) => format!(" {}{} {}/{} ", mark, test_type.name(), n, total),
                _ => format!(" {}{} ", mark, test_type.name()),
            };
            let width = label.chars().count() as u16;

            if x + width <= end {
                buf.set_string(x, area.y, &label, style);
                x += width;

                if i < TestType::ORDER.len() - 1 && x < end {
                    buf.set_string(x, area.y, "|", Style::default().fg(self.colors.dim));
                    x += 1;
                }
            }
        }

        for fill_x in x..end {
            buf.set_string(fill_x, area.y, " ", Style::default().bg(self.colors.bar_empty));
        }
    }
}
