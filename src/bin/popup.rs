use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};

use tracing::warn;

use marketplace_tracker::client::AggregatorClient;
use marketplace_tracker::config::Config;
use marketplace_tracker::presenter::format::{format_relative_time, truncate};
use marketplace_tracker::presenter::{ConnectionStatus, Mode, PopupState, EMPTY_STATE};
use marketplace_tracker::store::SqliteStore;
use marketplace_tracker::types::{now_ms, ActivityType};

struct Ctx {
    client: AggregatorClient,
    store: Option<SqliteStore>,
    export_dir: PathBuf,
    export_prefix: String,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let client = AggregatorClient::new(cfg.aggregator_url.clone())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let mut app = PopupState::new();

    // Direct reads need the aggregator's database file. The popup only reads
    // it; creating and migrating it is the tracker's job.
    let store = if cfg.db_path == ":memory:" {
        None
    } else {
        match SqliteStore::open_read_only(&cfg.db_path).await {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(db_path = %cfg.db_path, "Store not readable: {e}");
                app.store_error = Some(e.to_string());
                app.notice = Some(format!("Store not readable, showing stats only: {e}"));
                None
            }
        }
    };
    let ctx = Ctx {
        client,
        store,
        export_dir: PathBuf::from(&cfg.export_dir),
        export_prefix: cfg.export_prefix.clone(),
    };

    // Initial fetch before rendering
    app.refresh(&ctx.client, ctx.store.as_ref()).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &ctx).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut PopupState,
    ctx: &Ctx,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(2);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match (app.mode, key.code) {
                    (Mode::ConfirmClear, KeyCode::Char('y') | KeyCode::Char('Y')) => {
                        app.confirm_clear(&ctx.client, ctx.store.as_ref()).await;
                        last_tick = std::time::Instant::now();
                    }
                    (Mode::ConfirmClear, _) => app.cancel_clear(),
                    (Mode::Browsing, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) => return Ok(()),
                    (Mode::Browsing, KeyCode::Char('r') | KeyCode::Char('R')) => {
                        app.refresh(&ctx.client, ctx.store.as_ref()).await;
                        last_tick = std::time::Instant::now();
                    }
                    (Mode::Browsing, KeyCode::Char('c') | KeyCode::Char('C')) => app.request_clear(),
                    (Mode::Browsing, KeyCode::Char('e') | KeyCode::Char('E')) => {
                        app.export(ctx.store.as_ref(), &ctx.export_dir, &ctx.export_prefix).await;
                    }
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval && app.mode == Mode::Browsing {
            app.refresh(&ctx.client, ctx.store.as_ref()).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &PopupState) {
    let area = f.area();

    // Outer vertical split: header | body | notice | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // notice / confirmation
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_activity(f, app, chunks[1]);
    render_notice(f, app, chunks[2]);
    render_footer(f, chunks[3]);
}

fn render_header(f: &mut Frame, app: &PopupState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let updated = app
        .stats
        .last_update
        .map_or("-".to_string(), |ts| format!("updated {}", format_relative_time(ts, now_ms())));
    let enabled = app
        .settings
        .as_ref()
        .map_or(0, |s| s.marketplaces.len());

    let title_spans = vec![
        Span::styled(
            " Marketplace Activity  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} activities", app.stats.total_activities),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} listings", app.stats.total_listings),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(format!("{enabled} marketplaces"), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(updated, Style::default().fg(Color::DarkGray)),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_activity(f: &mut Frame, app: &PopupState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " RECENT ACTIVITY ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    if app.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            EMPTY_STATE,
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header_cells = ["Title", "Marketplace", "Type", "Time"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let now = now_ms();
    let rows: Vec<Row> = app
        .recent
        .iter()
        .map(|a| {
            let (kind, kind_color) = match a.kind {
                ActivityType::ListingViewed => ("viewed", Color::Green),
                ActivityType::ListingsViewed => ("browsed", Color::Cyan),
            };
            Row::new(vec![
                Cell::from(truncate(&a.label(), 48)),
                Cell::from(a.marketplace.to_string()),
                Cell::from(kind).style(Style::default().fg(kind_color)),
                Cell::from(format_relative_time(a.timestamp, now)).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(block);

    f.render_widget(table, area);
}

fn render_notice(f: &mut Frame, app: &PopupState, area: Rect) {
    let line = match (app.mode, &app.notice) {
        (Mode::ConfirmClear, _) => Line::from(Span::styled(
            " Delete all data? [y] yes  [any other key] no",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        (Mode::Browsing, Some(n)) => Line::from(Span::styled(format!(" {n}"), Style::default().fg(Color::Yellow))),
        (Mode::Browsing, None) => Line::default(),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[c] ", Style::default().fg(Color::Yellow)),
        Span::raw("clear  "),
        Span::styled("[e] ", Style::default().fg(Color::Yellow)),
        Span::raw("export  "),
        Span::styled("auto-refresh: 2s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
