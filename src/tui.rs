use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::analysis;
use crate::classifier::Classification;
use crate::comfy_table::{format_stoch, format_timestamp, format_value};
use crate::report::{BatchReport, SymbolReport};
use crate::storage_utils::AsyncStorageManager;

// --- App State ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Recommended,
    Good,
    All,
}

impl View {
    const ALL: [View; 3] = [View::Recommended, View::Good, View::All];

    fn title(&self) -> &'static str {
        match self {
            View::Recommended => "Recommended Buys",
            View::Good => "Good Buys",
            View::All => "All Tickers",
        }
    }

    fn rows<'a>(&self, batch: &'a BatchReport) -> &'a [SymbolReport] {
        match self {
            View::Recommended => &batch.recommended,
            View::Good => &batch.good,
            View::All => &batch.all,
        }
    }
}

struct App {
    data: BatchReport,
    storage_dir: PathBuf,
    is_refreshing: bool,
    last_error: Option<String>,
    selected_view: usize,
}

impl App {
    fn new(storage_dir: PathBuf, initial: BatchReport) -> Self {
        Self {
            data: initial,
            storage_dir,
            is_refreshing: false,
            last_error: None,
            selected_view: 0,
        }
    }

    fn view(&self) -> View {
        View::ALL[self.selected_view]
    }

    fn set_data(&mut self, new_data: BatchReport) {
        self.data = new_data;
        self.is_refreshing = false;
        self.last_error = None;
    }
}

// --- TUI ---

pub async fn run_tui(storage: &AsyncStorageManager) -> Result<()> {
    let initial = analysis::load_report(storage).await.unwrap_or_else(|_| BatchReport::empty());
    let mut app = App::new(storage.base_dir.clone(), initial);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let (data_tx, mut data_rx) = mpsc::channel::<std::result::Result<BatchReport, String>>(1);

    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Ok(result) = data_rx.try_recv() {
            match result {
                Ok(new_data) => app.set_data(new_data),
                Err(e) => {
                    app.is_refreshing = false;
                    app.last_error = Some(e);
                }
            }
        }

        if event::poll(Duration::from_millis(50))? {
            // Resize needs no handling: the next draw picks up the new size.
            if let Event::Key(key) = event::read()? {
                if !handle_key_event(key, app, &data_tx) {
                    return Ok(());
                }
            }
        }
    }
}

fn spawn_refresh(storage_dir: PathBuf, tx: mpsc::Sender<std::result::Result<BatchReport, String>>) {
    tokio::spawn(async move {
        let result = async {
            let storage = AsyncStorageManager::new(storage_dir).await?;
            analysis::run_analysis_pipeline(&storage).await
        }
        .await
        .map_err(|e| e.to_string());
        let _ = tx.send(result).await;
    });
}

/// Returns `false` when the user asked to quit.
fn handle_key_event(
    key: KeyEvent,
    app: &mut App,
    tx: &mpsc::Sender<std::result::Result<BatchReport, String>>,
) -> bool {
    if key.kind != KeyEventKind::Press {
        return true;
    }

    let views = View::ALL.len();
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::F(5) if !app.is_refreshing => {
            app.is_refreshing = true;
            spawn_refresh(app.storage_dir.clone(), tx.clone());
        }
        KeyCode::Up => {
            app.selected_view = app.selected_view.checked_sub(1).unwrap_or(views - 1);
        }
        KeyCode::Down => {
            app.selected_view = (app.selected_view + 1) % views;
        }
        KeyCode::Char(c) => {
            if let Some(digit) = c.to_digit(10) {
                if digit > 0 && digit as usize <= views {
                    app.selected_view = digit as usize - 1;
                }
            }
        }
        _ => {}
    }
    true
}

fn signal_color(class: Classification) -> Color {
    match class {
        Classification::RecommendedBuy => Color::Green,
        Classification::GoodBuy => Color::Cyan,
        Classification::NoSignal => Color::DarkGray,
    }
}

fn ui(f: &mut Frame, app: &App) {
    let main_layout = Layout::horizontal([Constraint::Percentage(18), Constraint::Percentage(82)])
        .split(f.size());

    let right_chunks =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).split(main_layout[1]);

    // Sidebar
    let sidebar_block = Block::default()
        .borders(Borders::ALL)
        .title_alignment(Alignment::Center);
    let inner_sidebar_area = sidebar_block.inner(main_layout[0]);
    f.render_widget(sidebar_block, main_layout[0]);

    let sidebar_chunks = Layout::vertical([
        Constraint::Min(1),    // view list
        Constraint::Length(1), // refresh hint
    ])
    .split(inner_sidebar_area);

    let view_lines: Vec<Line> = View::ALL
        .iter()
        .enumerate()
        .map(|(i, view)| {
            let text = format!("{} ({})", view.title(), view.rows(&app.data).len());
            let mut line = Line::from(text);
            if i == app.selected_view {
                line = line.style(Style::default().fg(Color::Yellow).bg(Color::DarkGray));
            }
            line
        })
        .collect();

    f.render_widget(Paragraph::new(view_lines), sidebar_chunks[0]);
    f.render_widget(
        Paragraph::new("F5 refreshes data").alignment(Alignment::Center),
        sidebar_chunks[1],
    );

    let status = match &app.last_error {
        Some(e) => format!("Refresh failed: {}", e),
        None => format!("Last Updated: {}", format_timestamp(app.data.generated_at)),
    };
    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title_alignment(Alignment::Center)
            .title(status),
        right_chunks[0],
    );

    let header = Row::new([
        Cell::from("Asset"),
        Cell::from("Price"),
        Cell::from("RSI (D)"),
        Cell::from("StochRSI (D)"),
        Cell::from("RSI (W)"),
        Cell::from("StochRSI (W)"),
        Cell::from("Signal"),
    ])
    .style(Style::default().bg(Color::DarkGray));

    let view = app.view();
    let rows = view.rows(&app.data).iter().map(|report| {
        let color = signal_color(report.classification);
        let price = match report.quoted_price() {
            Some(price) => format!("${:.2}", price),
            None => "N/A".to_string(),
        };

        Row::new([
            Cell::from(report.symbol.clone()).style(Style::default().fg(Color::Cyan)),
            Cell::from(price),
            Cell::from(format_value(report.daily.rsi)),
            Cell::from(format_stoch(&report.daily)),
            Cell::from(format_value(report.weekly.rsi)).style(Style::default().fg(color)),
            Cell::from(format_stoch(&report.weekly)).style(Style::default().fg(color)),
            Cell::from(report.classification.label()).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    f.render_widget(
        Table::new(
            rows,
            [
                Constraint::Percentage(12),
                Constraint::Percentage(12),
                Constraint::Percentage(12),
                Constraint::Percentage(15),
                Constraint::Percentage(12),
                Constraint::Percentage(15),
                Constraint::Percentage(22),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(view.title())),
        right_chunks[1],
    );

    if app.is_refreshing {
        let area = centered_rect(60, 20, main_layout[1]);
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new("Running analysis pipeline...\nPlease wait.")
                .block(Block::default().title("Refreshing").borders(Borders::ALL))
                .alignment(Alignment::Center),
            area,
        );
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);
    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_view_navigation() {
        let (tx, _rx) = mpsc::channel(1);
        let mut app = App::new(PathBuf::from("storage"), BatchReport::empty());

        assert!(handle_key_event(press(KeyCode::Up), &mut app, &tx));
        assert_eq!(app.view(), View::All);
        handle_key_event(press(KeyCode::Down), &mut app, &tx);
        assert_eq!(app.view(), View::Recommended);
        handle_key_event(press(KeyCode::Char('2')), &mut app, &tx);
        assert_eq!(app.view(), View::Good);
        handle_key_event(press(KeyCode::Char('9')), &mut app, &tx);
        assert_eq!(app.view(), View::Good);
        assert!(!handle_key_event(press(KeyCode::Char('q')), &mut app, &tx));
    }
}
