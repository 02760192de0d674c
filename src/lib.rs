//! parqtui: view a Parquet file in the terminal. The file is loaded into an
//! embedded analytical engine, its schema is shown in a sidebar, rows are
//! displayed in a virtualized grid, and an ad-hoc SQL box can point the grid
//! at a query's result instead of the raw file.

pub mod config;
pub mod engine;
pub mod session;
pub mod sql;
pub mod widgets;

pub use config::{load_app_config, AppConfig};
pub use engine::ColumnInfo;
pub use session::{DataSource, RowBlock, Session, ViewMode, FILE_VIEW, QUERY_VIEW};
pub use widgets::datatable::DataTableState;

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, StatefulWidget, Widget, Wrap},
};

use widgets::datatable::{parse_filter_input, DataTable};
use widgets::file_prompt::{FilePrompt, PromptEvent};
use widgets::schema::SchemaPanel;
use widgets::sql_editor::{EditorEvent, SqlEditor};

pub const APP_NAME: &str = "parqtui";

pub enum AppEvent {
    /// Begin engine startup (sent once after the first render).
    Init,
    Key(KeyEvent),
    /// A file was chosen; shows the busy state and hands off to DoOpen.
    Open(PathBuf),
    /// Internal: perform the ingestion after the UI has shown "loading".
    DoOpen(PathBuf),
    RunQuery(String),
    /// Internal: execute the query after the UI has shown "running".
    DoRunQuery(String),
    /// Re-ensure the grid's buffered window covers the visible rows.
    Update,
    Resize(u16, u16),
    Exit,
    Crash(String),
}

/// Coarse lifecycle of the session. `Failed` is terminal: engine startup
/// failed and only quitting is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    FilePrompt,
    Grid,
    Editor,
    FilterInput,
}

struct FilterInput {
    col_id: String,
    numeric: bool,
    value: String,
}

pub struct App {
    events: Sender<AppEvent>,
    config: AppConfig,
    phase: Phase,
    busy: Option<String>,
    error: Option<String>,
    sidebar_open: bool,
    focus: Focus,
    session: Option<Session>,
    pub table: DataTableState,
    sql_editor: SqlEditor,
    file_prompt: FilePrompt,
    filter_input: Option<FilterInput>,
}

impl App {
    pub fn new(events: Sender<AppEvent>) -> App {
        Self::new_with_config(events, AppConfig::default())
    }

    pub fn new_with_config(events: Sender<AppEvent>, config: AppConfig) -> App {
        let table = DataTableState::new(
            config.display.pages_lookahead,
            config.display.pages_lookback,
            config.display.page_size,
        );
        App {
            events,
            config,
            phase: Phase::Uninitialized,
            busy: None,
            error: None,
            sidebar_open: true,
            focus: Focus::FilePrompt,
            session: None,
            table,
            sql_editor: SqlEditor::new(),
            file_prompt: FilePrompt::new(),
            filter_input: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn send_event(&self, event: AppEvent) {
        let _ = self.events.send(event);
    }

    /// Handle one event; a returned event is fed back through the channel by
    /// the run loop, so a render happens between showing the busy state and
    /// doing the blocking work.
    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        match event {
            AppEvent::Init => {
                self.phase = Phase::Initializing;
                match Session::initialize() {
                    Ok(session) => {
                        self.session = Some(session);
                        self.phase = Phase::Ready;
                        self.focus = Focus::FilePrompt;
                    }
                    Err(e) => {
                        self.phase = Phase::Failed;
                        self.error = Some(format!("Failed to initialize database engine: {e}"));
                    }
                }
                None
            }
            AppEvent::Open(path) => {
                if self.phase != Phase::Ready {
                    return None;
                }
                self.error = None;
                self.busy = Some(format!("Loading {}...", path.display()));
                Some(AppEvent::DoOpen(path.clone()))
            }
            AppEvent::DoOpen(path) => {
                self.busy = None;
                let session = self.session.as_mut()?;
                match session.load_file(path) {
                    Ok(()) => {
                        let names = session.columns().iter().map(|c| c.name.clone()).collect();
                        self.table.set_columns(names);
                        self.focus = Focus::Grid;
                        Some(AppEvent::Update)
                    }
                    Err(e) => {
                        // The session keeps the attempted file name; the grid
                        // region stays visible with the error banner over it.
                        self.error = Some(e.to_string());
                        self.focus = if session.has_file() {
                            Focus::Grid
                        } else {
                            Focus::FilePrompt
                        };
                        None
                    }
                }
            }
            AppEvent::RunQuery(sql) => {
                if self.phase != Phase::Ready {
                    return None;
                }
                self.error = None;
                self.busy = Some("Running query...".to_string());
                Some(AppEvent::DoRunQuery(sql.clone()))
            }
            AppEvent::DoRunQuery(sql) => {
                self.busy = None;
                let session = self.session.as_mut()?;
                match session.run_query(sql) {
                    Ok(()) => {
                        let names = session.columns().iter().map(|c| c.name.clone()).collect();
                        self.table.set_columns(names);
                        self.focus = Focus::Grid;
                        self.sql_editor.set_focused(false);
                        Some(AppEvent::Update)
                    }
                    Err(e) => {
                        self.error = Some(e.to_string());
                        None
                    }
                }
            }
            AppEvent::Update => {
                if let Some(session) = self.session.as_mut() {
                    if session.has_file() && !session.columns().is_empty() {
                        if let Err(e) = self.table.refresh(session) {
                            self.error = Some(format!("Failed to fetch rows: {e}"));
                        }
                    }
                }
                None
            }
            AppEvent::Resize(_, _) => Some(AppEvent::Update),
            AppEvent::Key(key) => self.handle_key(*key),
            AppEvent::Exit | AppEvent::Crash(_) => None, // handled by the run loop
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppEvent::Exit);
        }
        if self.phase == Phase::Failed {
            return matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                .then_some(AppEvent::Exit);
        }
        if self.phase != Phase::Ready {
            return None;
        }
        match self.focus {
            Focus::FilePrompt => self.handle_prompt_key(key),
            Focus::Editor => self.handle_editor_key(key),
            Focus::FilterInput => self.handle_filter_key(key),
            Focus::Grid => self.handle_grid_key(key),
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        if key.code == KeyCode::Esc {
            let has_file = self.session.as_ref().is_some_and(|s| s.has_file());
            if has_file {
                self.focus = Focus::Grid;
                return None;
            }
            return Some(AppEvent::Exit);
        }
        match self.file_prompt.input(key) {
            PromptEvent::Submit(path) => Some(AppEvent::Open(path)),
            PromptEvent::None => None,
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        match self.sql_editor.input(key) {
            EditorEvent::Run => Some(AppEvent::RunQuery(self.sql_editor.text())),
            EditorEvent::Cancel => {
                self.focus = Focus::Grid;
                self.sql_editor.set_focused(false);
                None
            }
            EditorEvent::None => None,
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        let Some(filter) = self.filter_input.as_mut() else {
            self.focus = Focus::Grid;
            return None;
        };
        match key.code {
            KeyCode::Esc => {
                self.filter_input = None;
                self.focus = Focus::Grid;
                None
            }
            KeyCode::Enter => {
                let spec = parse_filter_input(filter.numeric, &filter.value);
                if spec.is_none() && filter.numeric && !filter.value.trim().is_empty() {
                    self.error = Some(format!("Not a number: {}", filter.value.trim()));
                } else {
                    let col_id = filter.col_id.clone();
                    self.table.set_filter(&col_id, spec);
                }
                self.filter_input = None;
                self.focus = Focus::Grid;
                Some(AppEvent::Update)
            }
            KeyCode::Backspace => {
                filter.value.pop();
                None
            }
            KeyCode::Char(c) => {
                filter.value.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_grid_key(&mut self, key: KeyEvent) -> Option<AppEvent> {
        let page = self.table.visible_rows.max(1) as i64;
        match key.code {
            KeyCode::Char('q') => Some(AppEvent::Exit),
            KeyCode::Char('e') => {
                self.focus = Focus::Editor;
                self.sql_editor.set_focused(true);
                if !self.sidebar_open {
                    self.sidebar_open = true;
                }
                None
            }
            KeyCode::Char('b') => {
                self.sidebar_open = !self.sidebar_open;
                None
            }
            KeyCode::Char('o') => {
                if let Some(session) = self.session.as_mut() {
                    session.clear_file();
                }
                self.table.set_columns(Vec::new());
                self.file_prompt.clear();
                self.error = None;
                self.focus = Focus::FilePrompt;
                None
            }
            KeyCode::Down | KeyCode::Char('j') => self.grid_scroll(1),
            KeyCode::Up | KeyCode::Char('k') => self.grid_scroll(-1),
            KeyCode::PageDown | KeyCode::Char(' ') => self.grid_scroll(page),
            KeyCode::PageUp => self.grid_scroll(-page),
            KeyCode::Home | KeyCode::Char('g') => {
                if let Some(session) = self.session.as_mut() {
                    if let Err(e) = self.table.jump_to_start(session) {
                        self.error = Some(format!("Failed to fetch rows: {e}"));
                    }
                }
                None
            }
            KeyCode::End | KeyCode::Char('G') => {
                if let Some(session) = self.session.as_mut() {
                    if let Err(e) = self.table.jump_to_end(session) {
                        self.error = Some(format!("Failed to fetch rows: {e}"));
                    }
                }
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.table.select_prev_column();
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.table.select_next_column();
                None
            }
            KeyCode::Char('s') => {
                self.table.toggle_sort();
                Some(AppEvent::Update)
            }
            KeyCode::Char('f') => {
                let Some(col_id) = self.table.selected_column_name().map(str::to_string) else {
                    return None;
                };
                let numeric = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.column_is_numeric(&col_id));
                self.filter_input = Some(FilterInput {
                    col_id,
                    numeric,
                    value: String::new(),
                });
                self.focus = Focus::FilterInput;
                None
            }
            KeyCode::Char('F') => {
                if let Some(col_id) = self.table.selected_column_name().map(str::to_string) {
                    self.table.set_filter(&col_id, None);
                    return Some(AppEvent::Update);
                }
                None
            }
            _ => None,
        }
    }

    fn grid_scroll(&mut self, rows: i64) -> Option<AppEvent> {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = self.table.scroll(rows, session) {
                self.error = Some(format!("Failed to fetch rows: {e}"));
            }
        }
        None
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

impl App {
    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![Span::styled(
            format!(" {APP_NAME} "),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        )];
        if let Some(session) = self.session.as_ref() {
            if let Some(name) = session.file_name() {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(name.to_string(), Style::default().fg(Color::White)));
                let mode = match session.view_mode() {
                    ViewMode::File => " [file]",
                    ViewMode::Query => " [query]",
                };
                spans.push(Span::styled(mode, Style::default().fg(Color::DarkGray)));
            }
        }
        Paragraph::new(Line::from(spans)).render(area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let line = if let Some(busy) = self.busy.as_ref() {
            Line::from(Span::styled(
                format!(" {busy}"),
                Style::default().fg(Color::Yellow),
            ))
        } else {
            Line::from(Span::styled(
                " q quit | e sql | s sort | f filter | F clear filter | b sidebar | o open file",
                Style::default().fg(Color::DarkGray),
            ))
        };
        Paragraph::new(line).render(area, buf);
    }

    fn render_banner(&self, area: Rect, buf: &mut Buffer) {
        let Some(message) = self.error.as_ref() else {
            return;
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Error ");
        Paragraph::new(message.clone())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false })
            .block(block)
            .render(area, buf);
    }

    fn render_sidebar(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7),
                Constraint::Fill(1),
                Constraint::Length(1),
            ])
            .split(area);
        (&self.sql_editor).render(chunks[0], buf);
        let columns = self
            .session
            .as_ref()
            .map(|s| s.columns())
            .unwrap_or_default();
        SchemaPanel::new(columns).render(chunks[1], buf);
        Paragraph::new(Line::from(Span::styled(
            " o: load another file",
            Style::default().fg(Color::DarkGray),
        )))
        .render(chunks[2], buf);
    }

    fn render_filter_input(&self, area: Rect, buf: &mut Buffer) {
        let Some(filter) = self.filter_input.as_ref() else {
            return;
        };
        let popup = centered_rect(area, area.width.saturating_sub(8).clamp(20, 60), 3);
        Clear.render(popup, buf);
        let kind = if filter.numeric { "number" } else { "text" };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(format!(" Filter {} ({kind}) ", filter.col_id));
        Paragraph::new(filter.value.as_str())
            .block(block)
            .render(popup, buf);
    }

    fn render_ready(&mut self, area: Rect, buf: &mut Buffer) {
        let banner_height = if self.error.is_some() { 4 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(banner_height),
                Constraint::Fill(1),
                Constraint::Length(1),
            ])
            .split(area);
        self.render_header(chunks[0], buf);
        self.render_banner(chunks[1], buf);
        self.render_status(chunks[3], buf);
        let main = chunks[2];

        let has_file = self.session.as_ref().is_some_and(|s| s.has_file());
        if !has_file {
            let prompt_area = centered_rect(main, 70, 4);
            (&self.file_prompt).render(prompt_area, buf);
            return;
        }

        let grid_area = if self.sidebar_open {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(self.config.display.sidebar_width),
                    Constraint::Fill(1),
                ])
                .split(main);
            self.render_sidebar(cols[0], buf);
            cols[1]
        } else {
            main
        };

        let view_mode = self
            .session
            .as_ref()
            .map(|s| s.view_mode())
            .unwrap_or(ViewMode::File);
        let (empty_message, empty_submessage) = match view_mode {
            ViewMode::Query => (
                "Query returned 0 results",
                "Check your WHERE clause. Text values must match exactly (case-sensitive) and have no hidden whitespace. Try using LIKE '%value%' to find it.",
            ),
            ViewMode::File => ("No rows", "The file or the current filters matched nothing."),
        };
        let grid = DataTable::new(self.config.display.alternate_row_shading)
            .empty_message(empty_message, empty_submessage);
        StatefulWidget::render(grid, grid_area, buf, &mut self.table);

        // Rendering is where the grid learns its viewport height; if the
        // buffered block was fetched for a smaller view, top up on the
        // next pass through the event loop.
        if self.table.needs_refresh() {
            let _ = self.events.send(AppEvent::Update);
        }

        self.render_filter_input(grid_area, buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.phase {
            Phase::Uninitialized | Phase::Initializing => {
                let message = centered_rect(area, 40, 1);
                Paragraph::new("Initializing database engine...")
                    .centered()
                    .render(message, buf);
            }
            Phase::Failed => {
                let message = centered_rect(area, area.width.saturating_sub(8).max(20), 5);
                let text = self
                    .error
                    .clone()
                    .unwrap_or_else(|| "Failed to initialize database engine.".to_string());
                Paragraph::new(format!("{text}\n\nPress q to quit."))
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: false })
                    .centered()
                    .render(message, buf);
            }
            Phase::Ready => self.render_ready(area, buf),
        }
    }
}
