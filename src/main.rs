//! Cognitive Battery - four timed attention and memory tasks in the terminal
//!
//! Runs SART, Flanker, 2-Back and PVT back to back and shows an aggregate
//! score with an ability profile at the end.

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn, LevelFilter};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::{
    fs::{self, OpenOptions},
    io::stdout,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use cognitive_battery::{
    config::Config,
    engine::DisplayState,
    input::from_terminal_event,
    persist::JsonDirSink,
    session::SessionPhase,
    timing::MonotonicClock,
    ui::{
        App, AppState, InstructionsPanel, IntroPanel, ResultsPanel, StatusBar, StimulusPanel,
        SummaryPanel, TaskBar, TransitionPanel,
    },
};

/// Send log output to a file; the alternate screen owns the terminal.
fn init_logging() {
    let Some(dir) = dirs::data_local_dir().map(|d| d.join("cognitive-battery")) else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("battery.log"))
    else {
        return;
    };
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn draw(frame: &mut Frame, app: &App) {
    let size = frame.area();
    let colors = app.colors;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Task bar
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    let orchestrator = app.orchestrator();
    let progress = orchestrator.engine().and_then(|e| e.trial_progress());
    let task_bar =
        TaskBar::new(orchestrator.session(), app.current_task(), colors).trial(progress);
    frame.render_widget(task_bar, chunks[0]);

    match app.phase() {
        SessionPhase::Intro => frame.render_widget(IntroPanel::new(colors), chunks[1]),
        SessionPhase::Running(test_type) => match orchestrator.engine() {
            Some(engine) => match engine.display() {
                DisplayState::Instructions => {
                    frame.render_widget(InstructionsPanel::new(test_type, colors), chunks[1])
                }
                display => frame.render_widget(StimulusPanel::new(display, colors), chunks[1]),
            },
            None => frame.render_widget(IntroPanel::new(colors), chunks[1]),
        },
        SessionPhase::Transition { next } => {
            let remaining = orchestrator.transition_remaining_ms().unwrap_or(0.0);
            frame.render_widget(TransitionPanel::new(next, remaining, colors), chunks[1]);
        }
        SessionPhase::Summary | SessionPhase::Abandoned => {
            let results = app.results();
            let mut constraints = vec![Constraint::Length(7)];
            constraints.extend(results.iter().map(|_| Constraint::Min(4)));
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints(constraints)
                .split(chunks[1]);

            match orchestrator.summary() {
                Some(summary) => frame.render_widget(SummaryPanel::new(summary, colors), rows[0]),
                None => frame.render_widget(
                    StimulusPanel::new(DisplayState::Aborted, colors),
                    rows[0],
                ),
            }

            let panels = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(
                    results
                        .iter()
                        .map(|_| Constraint::Ratio(1, results.len() as u32)),
                )
                .split(rows.get(1).copied().unwrap_or(rows[0]));
            for (result, area) in results.iter().zip(panels.iter()) {
                let lines = result.summary_lines();
                let panel = ResultsPanel::new(&lines, result.test_type().name(), colors);
                frame.render_widget(panel, *area);
            }
        }
    }

    let elapsed = app.elapsed_formatted();
    let status = StatusBar::new(
        app.state_label(),
        app.view_name(),
        &elapsed,
        app.total_inputs,
        colors,
    )
    .message(app.get_status());
    frame.render_widget(status, chunks[2]);
}

fn main() -> Result<()> {
    init_logging();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("could not load config, using defaults: {}", e);
            Config::default()
        }
    };
    let tick_rate = config.refresh_interval();
    let results_dir = config.output.results_dir.clone();

    let mut app = App::new(config, MonotonicClock::new())?;
    if let Some(dir) = results_dir {
        info!("saving results under {}", dir.display());
        app = app.with_sink(JsonDirSink::new(dir));
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        app.tick();

        terminal.draw(|frame| draw(frame, &app))?;

        if event::poll(tick_rate)? {
            let event = event::read()?;
            // Stamp before any further work so response times stay tight
            let now = app.now_ms();
            let width = terminal.size()?.width;

            match &event {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        interrupted.store(true, Ordering::SeqCst)
                    }
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char('s') => app.start(),
                    KeyCode::Char('e') => {
                        let filename = format!(
                            "battery_report_{}.json",
                            chrono::Utc::now().format("%Y%m%d_%H%M%S")
                        );
                        if let Err(e) = app.export_report(&filename) {
                            app.set_status(format!("Export failed: {}", e));
                        }
                    }
                    _ => {
                        if let Some(input) = from_terminal_event(&event, width, now) {
                            app.process_input(input);
                        }
                    }
                },
                _ => {
                    if let Some(input) = from_terminal_event(&event, width, now) {
                        app.process_input(input);
                    }
                }
            }
        }

        if interrupted.load(Ordering::SeqCst) {
            info!("interrupted");
            app.quit();
        }

        if app.state == AppState::Quitting {
            break;
        }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    println!("\nCognitive Battery session ended.");
    if let Some(report) = app.generate_report() {
        print!("{}", report.to_text());
    }
    if let Some(path) = app.exported_report() {
        println!("Report written to {}", path.display());
    }

    Ok(())
}
