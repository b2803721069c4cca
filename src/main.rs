use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tracing::error;
use tracing_subscriber::EnvFilter;

use hoops_terminal::data;
use hoops_terminal::export;
use hoops_terminal::persist;
use hoops_terminal::pipeline;
use hoops_terminal::render;
use hoops_terminal::resources;
use hoops_terminal::state::{AppState, Focus};

struct App {
    state: AppState,
    should_quit: bool,
}

impl App {
    fn new() -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.state.help_overlay = false;
            }
            return;
        }
        match key.code {
            KeyCode::Tab => self.state.cycle_focus(),
            KeyCode::Enter => self.predict(),
            KeyCode::Left | KeyCode::Up => self.state.select_prev(),
            KeyCode::Right | KeyCode::Down => self.state.select_next(),
            KeyCode::Backspace => {
                if self.state.focus == Focus::Player {
                    self.state.player_input.pop();
                }
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(c) => {
                if self.state.focus == Focus::Player {
                    self.state.player_input.push(c);
                } else {
                    match c {
                        'q' => self.should_quit = true,
                        'x' => self.export_report(),
                        '?' => self.state.help_overlay = true,
                        'j' => self.state.select_next(),
                        'k' => self.state.select_prev(),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    // Request-synchronous by design: the whole pipeline runs here, stage by
    // stage, before the next frame is drawn.
    fn predict(&mut self) {
        let player = self.state.player_input.trim().to_string();
        if player.is_empty() {
            self.state
                .push_log("[INFO] Please enter a player's name to begin prediction");
            return;
        }
        let season = self.state.season().to_string();
        let opponent = self.state.opponent().to_string();
        if opponent.is_empty() {
            self.state.push_log("[WARN] No opponent selected");
            return;
        }
        self.state
            .push_log(format!("[INFO] Predicting {player} vs {opponent} ({season})"));

        match pipeline::run_prediction(&player, &opponent, &season) {
            Ok(outcome) => {
                self.state.error_banner = None;
                if let Ok(res) = resources::load_season(&season) {
                    self.state.set_opponents(
                        res.dataset
                            .teams
                            .iter()
                            .map(|t| t.abbreviation.clone())
                            .collect(),
                    );
                }
                if outcome.explanation.is_none() {
                    self.state.push_log("[WARN] Explanation unavailable");
                }
                if let Some(note) = &outcome.render_note {
                    self.state.push_log(format!("[WARN] {note}"));
                }
                if let Some(doc) = &outcome.visual {
                    self.save_graph_document(doc);
                }
                self.state.outcome = Some(outcome);
            }
            Err(err) => {
                error!("prediction failed: {err:?}");
                self.state.push_log(format!("[WARN] {}", err.user_message()));
                self.state.error_banner = Some(err.user_message());
            }
        }
    }

    fn save_graph_document(&mut self, doc: &render::VisualDocument) {
        let Some(path) = persist::artifact_path("subgraph.html") else {
            return;
        };
        match fs::write(&path, &doc.html) {
            Ok(()) => self
                .state
                .push_log(format!("[INFO] Graph written to {}", path.display())),
            Err(err) => self
                .state
                .push_log(format!("[WARN] Could not write graph: {err}")),
        }
    }

    fn export_report(&mut self) {
        let Some(outcome) = &self.state.outcome else {
            self.state.push_log("[INFO] Nothing to export yet");
            return;
        };
        let Some(path) = persist::artifact_path("prediction_report.xlsx") else {
            self.state
                .push_log("[WARN] No writable cache directory for the report");
            return;
        };
        match export::export_prediction_report(&path, outcome) {
            Ok(summary) => self.state.push_log(format!(
                "[INFO] Report written to {} ({} nodes, {} relationships)",
                path.display(),
                summary.nodes,
                summary.relationships
            )),
            Err(err) => {
                error!("report export failed: {err:#}");
                self.state.push_log("[WARN] Report export failed");
            }
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new();
    if let Some(season) = app.state.seasons.first().cloned() {
        if let Ok(teams) = data::get_team_data(&season) {
            app.state
                .set_opponents(teams.into_iter().map(|t| t.abbreviation).collect());
        }
    }
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

// The TUI owns the terminal, so diagnostics go to a log file in the cache
// dir instead of stderr.
fn init_tracing() {
    let Some(path) = persist::artifact_path("hoops_terminal.log") else {
        return;
    };
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init();
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(&app.state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_body(frame, chunks[1], &app.state);

    let footer =
        Paragraph::new(footer_text(&app.state)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let line1 = format!(
        "  .--.  HOOPS TERMINAL | {} | vs {}",
        state.season(),
        state.opponent()
    );
    let line2 = " ( () )  NBA Player Performance Prediction".to_string();
    let line3 = "  `--'".to_string();
    format!("{line1}\n{line2}\n{line3}")
}

fn footer_text(state: &AppState) -> String {
    match state.focus {
        Focus::Player => {
            "Type player name | Tab Next field | Enter Predict | Esc Quit".to_string()
        }
        _ => "Tab Next field | \u{2190}/\u{2192} Adjust | Enter Predict | x Export | ? Help | q Quit"
            .to_string(),
    }
}

fn render_body(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(40)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(1)])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Min(1),
        ])
        .split(columns[1]);

    let form = Paragraph::new(form_lines(state))
        .block(Block::default().title("Matchup").borders(Borders::ALL));
    frame.render_widget(form, left[0]);

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, left[1]);

    let prediction = Paragraph::new(prediction_lines(state))
        .block(Block::default().title("Prediction").borders(Borders::ALL));
    frame.render_widget(prediction, right[0]);

    let explanation = Paragraph::new(explanation_lines(state))
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Explanation").borders(Borders::ALL));
    frame.render_widget(explanation, right[1]);

    let graph = Paragraph::new(graph_lines(state)).block(
        Block::default()
            .title("Knowledge Graph Subgraph")
            .borders(Borders::ALL),
    );
    frame.render_widget(graph, right[2]);
}

fn form_lines(state: &AppState) -> Vec<Line<'static>> {
    let focused = Style::default().add_modifier(Modifier::BOLD);
    let line = |active: bool, text: String| {
        let marker = if active { "\u{25b8} " } else { "  " };
        if active {
            Line::styled(format!("{marker}{text}"), focused)
        } else {
            Line::raw(format!("{marker}{text}"))
        }
    };

    vec![
        line(
            state.focus == Focus::Player,
            format!("Player:   {}_", state.player_input),
        ),
        Line::raw(""),
        line(
            state.focus == Focus::Season,
            format!("Season:   \u{25c2} {} \u{25b8}", state.season()),
        ),
        Line::raw(""),
        line(
            state.focus == Focus::Opponent,
            format!("Opponent: \u{25c2} {} \u{25b8}", state.opponent()),
        ),
    ]
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(12)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn prediction_lines(state: &AppState) -> Vec<Line<'static>> {
    if let Some(err) = &state.error_banner {
        return vec![Line::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )];
    }
    let Some(outcome) = &state.outcome else {
        return vec![Line::styled(
            "No prediction yet. Fill in the matchup and press Enter.",
            Style::default().fg(Color::DarkGray),
        )];
    };
    vec![
        Line::styled(
            format!("{} vs {}", outcome.player_name, outcome.opponent),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::raw(pipeline::format_points_line(&outcome.prediction)),
        Line::raw(pipeline::format_threshold_line(&outcome.prediction)),
        Line::raw(format!("Team: {}", outcome.context.player_team)),
        Line::raw(format!("Season: {}", outcome.season)),
    ]
}

fn explanation_lines(state: &AppState) -> Vec<Line<'static>> {
    let Some(outcome) = &state.outcome else {
        return vec![Line::styled(
            "The explanation appears here after a prediction.",
            Style::default().fg(Color::DarkGray),
        )];
    };
    match &outcome.explanation {
        Some(text) => vec![Line::raw(text.clone())],
        None => vec![Line::styled(
            "Explanation unavailable.",
            Style::default().fg(Color::Yellow),
        )],
    }
}

fn graph_lines(state: &AppState) -> Vec<Line<'static>> {
    let Some(outcome) = &state.outcome else {
        return vec![Line::styled(
            "No subgraph to display.",
            Style::default().fg(Color::DarkGray),
        )];
    };
    if outcome.subgraph.is_empty() {
        return vec![Line::styled(
            "No subgraph available to display.",
            Style::default().fg(Color::Yellow),
        )];
    }

    let view = render::presentation_view(&outcome.subgraph);
    let labels: HashMap<&str, &str> = view
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.label.as_str()))
        .collect();

    let mut lines = Vec::new();
    for node in &view.nodes {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", shape_glyph(node.shape)),
                Style::default().fg(terminal_color(node.color)),
            ),
            Span::raw(node.label.clone()),
            Span::styled(
                format!("  [{}]", node.node_type),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }
    lines.push(Line::raw(""));
    for edge in &view.edges {
        let source = labels
            .get(edge.source.as_str())
            .copied()
            .unwrap_or(edge.source.as_str());
        let target = labels
            .get(edge.target.as_str())
            .copied()
            .unwrap_or(edge.target.as_str());
        lines.push(Line::styled(
            format!("{source} \u{2500}{}\u{2192} {target}", edge.relation),
            Style::default().fg(Color::Gray),
        ));
    }
    if let Some(doc) = &outcome.visual {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format!(
                "{} nodes / {} edges \u{2014} interactive HTML saved to the cache dir",
                doc.node_count, doc.edge_count
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(note) = &outcome.render_note {
        lines.push(Line::styled(
            note.clone(),
            Style::default().fg(Color::Red),
        ));
    }
    lines
}

// Terminal-side mapping of the fixed style table.
fn terminal_color(color: &str) -> Color {
    match color {
        "blue" => Color::Blue,
        "green" => Color::Green,
        "red" => Color::Red,
        "purple" => Color::Magenta,
        "orange" => Color::Rgb(255, 165, 0),
        "yellow" => Color::Yellow,
        _ => Color::Gray,
    }
}

fn shape_glyph(shape: &str) -> &'static str {
    match shape {
        "ellipse" => "\u{25cf}",
        "box" => "\u{25a0}",
        "diamond" => "\u{25c6}",
        "triangle" => "\u{25b2}",
        "star" => "\u{2605}",
        _ => "\u{2022}",
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Hoops Terminal - Help",
        "",
        "Form:",
        "  Tab          Cycle field",
        "  \u{2190}/\u{2192} or j/k  Adjust season/opponent",
        "  Enter        Predict",
        "",
        "Result:",
        "  x            Export XLSX report",
        "",
        "Global:",
        "  ?            Toggle help (selectors focused)",
        "  q / Esc      Quit",
        "",
        "The rendered subgraph is also written to the cache",
        "directory as subgraph.html after each prediction.",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
