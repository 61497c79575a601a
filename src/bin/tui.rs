mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use tui_app::{
    format_diff, format_line, format_price, short_market, truncate, AppState, ConnectionStatus,
    Mode,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .expect("failed to build HTTP client");

    let mut app = AppState::new(base_url);

    // Initial status probe before rendering
    app.refresh_status(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut row_state = TableState::default();
    row_state.select(None);

    let result = run_loop(&mut terminal, &mut app, &client, &mut row_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    row_state: &mut TableState,
) -> io::Result<()> {
    // Status polls are cheap (no metered upstream calls); compare/snapshot
    // run only on explicit keys since each one may burn API credits.
    let status_interval = Duration::from_secs(2);
    let mut last_status = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, row_state))?;

        let timeout = status_interval
            .checked_sub(last_status.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if app.editing_query {
                        match key.code {
                            KeyCode::Enter => {
                                app.editing_query = false;
                                app.set_mode(Mode::Search);
                                app.compare(client).await;
                            }
                            KeyCode::Esc => app.editing_query = false,
                            KeyCode::Backspace => {
                                app.query.pop();
                            }
                            KeyCode::Char(c) => app.query.push(c),
                            _ => {}
                        }
                        continue;
                    }

                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('1') => app.set_mode(Mode::Scanner),
                        KeyCode::Char('2') => app.set_mode(Mode::Search),
                        KeyCode::Char('3') => app.set_mode(Mode::Totals),
                        KeyCode::Char('s') => app.take_snapshot(client).await,
                        KeyCode::Char('c') => app.compare(client).await,
                        KeyCode::Char('f') => app.force_refresh(client).await,
                        KeyCode::Char('/') => {
                            app.editing_query = true;
                        }
                        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_threshold(0.5),
                        KeyCode::Char('-') => app.adjust_threshold(-0.5),
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.rows.len().saturating_sub(1);
                            let next = row_state.selected().map_or(0, |i| (i + 1).min(max));
                            row_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = row_state.selected().map_or(0, |i| i.saturating_sub(1));
                            row_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_status.elapsed() >= status_interval {
            app.refresh_status(client).await;
            last_status = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, row_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | body | message | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // result table
            Constraint::Length(1), // status message
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_rows_table(f, app, row_state, chunks[1]);
    render_message(f, app, chunks[2]);
    render_footer(f, app, chunks[3]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (conn_text, conn_color) = match &app.conn {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let snapshot_str = app
        .status
        .snapshot_last_updated
        .as_deref()
        .unwrap_or("no snapshot");
    let credits_str = app
        .status
        .credits_remaining
        .as_deref()
        .map_or("credits: -".to_string(), |c| format!("credits: {c}"));

    let mode_spans: Vec<Span> = [Mode::Scanner, Mode::Search, Mode::Totals]
        .into_iter()
        .flat_map(|m| {
            let style = if m == app.mode {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            vec![Span::styled(format!(" {} ", m.label()), style), Span::raw(" ")]
        })
        .collect();

    let mut title_spans = vec![
        Span::styled(
            " Line Watch  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(conn_text, Style::default().fg(conn_color)),
        Span::raw("  │  "),
    ];
    title_spans.extend(mode_spans);
    title_spans.extend([
        Span::raw(" │  "),
        Span::styled(
            format!("threshold: {:.1}", app.threshold()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(format!("snapshot: {snapshot_str}"), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(credits_str, Style::default().fg(Color::White)),
    ]);

    let paragraph = Paragraph::new(Line::from(title_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(paragraph, area);
}

fn render_rows_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["Subject", "Market", "Matchup", "Pre", "Live", "Diff", "O", "U", "Status"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .rows
        .iter()
        .map(|r| {
            let diff_color = match r.diff {
                Some(d) if d > 0.0 => Color::Green,
                Some(d) if d < 0.0 => Color::Red,
                Some(_) => Color::White,
                None => Color::DarkGray,
            };
            let status_color = if r.status == "active" { Color::Green } else { Color::DarkGray };

            Row::new(vec![
                Cell::from(truncate(&r.subject, 24)),
                Cell::from(short_market(&r.market_key)),
                Cell::from(truncate(&r.matchup, 26)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(format_line(r.pre_line)),
                Cell::from(format_line(r.live_line)),
                Cell::from(format_diff(r.diff)).style(Style::default().fg(diff_color)),
                Cell::from(format_price(Some(r.over_price))),
                Cell::from(format_price(r.under_price)),
                Cell::from(r.status.clone()).style(Style::default().fg(status_color)),
            ])
        })
        .collect();

    let title = if app.editing_query {
        format!(" SEARCH: {}▏ ", app.query)
    } else if app.query.is_empty() {
        format!(" {} RESULTS ({}) ", app.mode.label(), app.rows.len())
    } else {
        format!(" {} RESULTS ({}) for '{}' ", app.mode.label(), app.rows.len(), app.query)
    };

    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(18),
            Constraint::Length(26),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_message(f: &mut Frame, app: &AppState, area: Rect) {
    let paragraph = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(&app.message, Style::default().fg(Color::White)),
    ]));
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let line = if app.editing_query {
        Line::from(vec![
            Span::styled(" [Enter] ", Style::default().fg(Color::Yellow)),
            Span::raw("run search  "),
            Span::styled("[Esc] ", Style::default().fg(Color::Yellow)),
            Span::raw("cancel"),
        ])
    } else {
        Line::from(vec![
            Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
            Span::raw("quit  "),
            Span::styled("[1/2/3] ", Style::default().fg(Color::Yellow)),
            Span::raw("mode  "),
            Span::styled("[s] ", Style::default().fg(Color::Yellow)),
            Span::raw("snapshot  "),
            Span::styled("[c] ", Style::default().fg(Color::Yellow)),
            Span::raw("compare  "),
            Span::styled("[f] ", Style::default().fg(Color::Yellow)),
            Span::raw("force refresh  "),
            Span::styled("[/] ", Style::default().fg(Color::Yellow)),
            Span::raw("search  "),
            Span::styled("[+/-] ", Style::default().fg(Color::Yellow)),
            Span::raw("threshold"),
        ])
    };
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
