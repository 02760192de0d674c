//! Virtualized grid over a [`DataSource`]. The widget never owns the data:
//! it keeps a buffered window of rows around the visible area and pulls a
//! fresh block through the data source whenever scrolling, sorting, or
//! filtering moves the view outside that window.

use std::borrow::Cow;
use std::collections::BTreeMap;

use color_eyre::Result;
use polars::prelude::{AnyValue, DataFrame};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

use crate::session::DataSource;
use crate::sql::{FilterSpec, NumberFilterOp, RowFetchRequest, SortSpec, TextFilterOp};

pub struct DataTableState {
    pub start_row: usize,
    pub visible_rows: usize,
    pub num_rows: usize,
    /// When true, the total row count matches the current filter state and
    /// refresh() can skip the fetch if the view is inside the buffer.
    num_rows_valid: bool,
    buffered_df: Option<DataFrame>,
    buffered_start_row: usize,
    buffered_end_row: usize,
    pages_lookahead: usize,
    pages_lookback: usize,
    /// Fixed fetch-page size; 0 sizes pages to the viewport height.
    page_size: usize,
    pub table_state: TableState,
    column_names: Vec<String>,
    pub selected_col: usize,
    first_visible_col: usize,
    sort_model: Vec<SortSpec>,
    filter_model: BTreeMap<String, FilterSpec>,
}

impl DataTableState {
    pub fn new(pages_lookahead: usize, pages_lookback: usize, page_size: usize) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            start_row: 0,
            visible_rows: 0,
            num_rows: 0,
            num_rows_valid: false,
            buffered_df: None,
            buffered_start_row: 0,
            buffered_end_row: 0,
            pages_lookahead,
            pages_lookback,
            page_size,
            table_state,
            column_names: Vec::new(),
            selected_col: 0,
            first_visible_col: 0,
            sort_model: Vec::new(),
            filter_model: BTreeMap::new(),
        }
    }

    /// Point the grid at a new view: new columns, cursor back to the top,
    /// sort and filter state cleared.
    pub fn set_columns(&mut self, column_names: Vec<String>) {
        self.column_names = column_names;
        self.selected_col = 0;
        self.first_visible_col = 0;
        self.sort_model.clear();
        self.filter_model.clear();
        self.start_row = 0;
        self.invalidate();
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn selected_column_name(&self) -> Option<&str> {
        self.column_names.get(self.selected_col).map(String::as_str)
    }

    pub fn sort_model(&self) -> &[SortSpec] {
        &self.sort_model
    }

    pub fn filter_model(&self) -> &BTreeMap<String, FilterSpec> {
        &self.filter_model
    }

    /// Drop the buffered block and the cached total; the next refresh()
    /// fetches both.
    fn invalidate(&mut self) {
        self.num_rows_valid = false;
        self.buffered_df = None;
        self.buffered_start_row = 0;
        self.buffered_end_row = 0;
    }

    fn request(&self, start_row: usize, end_row: usize) -> RowFetchRequest {
        RowFetchRequest {
            start_row,
            end_row,
            sort_model: self.sort_model.clone(),
            filter_model: self.filter_model.clone(),
        }
    }

    /// Make sure the buffered block covers the visible window, fetching
    /// through `source` when it does not. The fetched window is the view
    /// plus lookback/lookahead pages so nearby scrolling stays local.
    ///
    /// Runs up to twice: the first fetch may learn a total row count that
    /// clamps start_row outside the block just fetched (e.g. jump-to-end
    /// before the count was known).
    pub fn refresh(&mut self, source: &mut dyn DataSource) -> Result<()> {
        let view_rows = self.visible_rows.max(1);
        let page = if self.page_size > 0 {
            self.page_size
        } else {
            view_rows
        };
        for _ in 0..2 {
            if self.num_rows_valid {
                if self.num_rows == 0 {
                    self.start_row = 0;
                    self.buffered_df = None;
                    return Ok(());
                }
                self.start_row = self.start_row.min(self.num_rows - 1);
                let view_end = (self.start_row + view_rows).min(self.num_rows);
                let within = self.buffered_df.is_some()
                    && self.start_row >= self.buffered_start_row
                    && view_end <= self.buffered_end_row;
                if within {
                    return Ok(());
                }
            }
            let fetch_start = self.start_row.saturating_sub(self.pages_lookback * page);
            // A fixed page size smaller than the viewport must still cover it.
            let fetch_end = self.start_row + ((1 + self.pages_lookahead) * page).max(view_rows);
            let block = source.fetch_rows(&self.request(fetch_start, fetch_end))?;
            self.num_rows = block.total_rows;
            self.num_rows_valid = true;
            self.buffered_start_row = fetch_start;
            self.buffered_end_row = fetch_start + block.df.height();
            self.buffered_df = Some(block.df);
        }
        Ok(())
    }

    /// True when the buffered block no longer covers the visible window.
    /// The viewport height is only learned during render, so the first
    /// frame after a load can outgrow the block fetched before it; the
    /// caller checks this after rendering and schedules another refresh.
    pub fn needs_refresh(&self) -> bool {
        if self.column_names.is_empty() {
            return false;
        }
        if !self.num_rows_valid {
            return true;
        }
        if self.num_rows == 0 {
            return false;
        }
        let start = self.start_row.min(self.num_rows - 1);
        let view_end = (start + self.visible_rows.max(1)).min(self.num_rows);
        !(self.buffered_df.is_some()
            && start >= self.buffered_start_row
            && view_end <= self.buffered_end_row)
    }

    pub fn scroll(&mut self, rows: i64, source: &mut dyn DataSource) -> Result<()> {
        self.start_row = if rows < 0 {
            self.start_row.saturating_sub(rows.unsigned_abs() as usize)
        } else {
            self.start_row.saturating_add(rows as usize)
        };
        self.refresh(source)
    }

    pub fn jump_to_start(&mut self, source: &mut dyn DataSource) -> Result<()> {
        self.start_row = 0;
        self.refresh(source)
    }

    pub fn jump_to_end(&mut self, source: &mut dyn DataSource) -> Result<()> {
        self.start_row = self.num_rows.saturating_sub(self.visible_rows.max(1));
        self.refresh(source)
    }

    pub fn select_next_column(&mut self) {
        if self.selected_col + 1 < self.column_names.len() {
            self.selected_col += 1;
        }
    }

    pub fn select_prev_column(&mut self) {
        self.selected_col = self.selected_col.saturating_sub(1);
        if self.selected_col < self.first_visible_col {
            self.first_visible_col = self.selected_col;
        }
    }

    /// Cycle the selected column's sort: none -> asc -> desc -> none.
    /// Single-column sort; changing it restarts at the top and refetches.
    pub fn toggle_sort(&mut self) {
        let Some(name) = self.selected_column_name().map(str::to_string) else {
            return;
        };
        let current = self
            .sort_model
            .first()
            .filter(|s| s.col_id == name)
            .map(|s| s.sort.clone());
        self.sort_model = match current.as_deref() {
            Some("asc") => vec![SortSpec::desc(name)],
            Some("desc") => Vec::new(),
            _ => vec![SortSpec::asc(name)],
        };
        self.start_row = 0;
        self.invalidate();
    }

    /// Set or clear (with None) the filter on `col_id`. The filtered total
    /// changes, so the cached count and buffer are dropped.
    pub fn set_filter(&mut self, col_id: &str, spec: Option<FilterSpec>) {
        match spec {
            Some(spec) => {
                self.filter_model.insert(col_id.to_string(), spec);
            }
            None => {
                self.filter_model.remove(col_id);
            }
        }
        self.start_row = 0;
        self.invalidate();
    }

    pub fn filter_for(&self, col_id: &str) -> Option<&FilterSpec> {
        self.filter_model.get(col_id)
    }

    fn sort_indicator(&self, col_id: &str) -> Option<&'static str> {
        self.sort_model
            .first()
            .filter(|s| s.col_id == col_id)
            .map(|s| if s.sort == "asc" { " ^" } else { " v" })
    }

    /// The rows currently on screen, sliced out of the buffered block.
    pub fn visible_slice(&self) -> Option<DataFrame> {
        let df = self.buffered_df.as_ref()?;
        let offset = self.start_row.saturating_sub(self.buffered_start_row);
        if offset >= df.height() {
            return None;
        }
        Some(df.slice(offset as i64, self.visible_rows.max(1)))
    }

    fn title(&self) -> String {
        if self.num_rows == 0 {
            return " 0 rows ".to_string();
        }
        let last = (self.start_row + self.visible_rows.max(1)).min(self.num_rows);
        let mut title = format!(" rows {}-{} of {} ", self.start_row + 1, last, self.num_rows);
        if !self.filter_model.is_empty() {
            title.push_str(&format!("[{} filtered] ", self.filter_model.len()));
        }
        title
    }
}

/// Parse the filter prompt's text into a filter for the selected column.
/// Empty input clears the filter (None).
///
/// Numeric columns take an optional comparison prefix (`=`, `!=`, `>`, `<`,
/// `>=`, `<=`), defaulting to equals. Text columns: `=v` equals, `!=v`
/// not-equal, `!~v` not-contains, `^v` starts-with, `v$` ends-with,
/// anything else contains.
pub fn parse_filter_input(numeric: bool, input: &str) -> Option<FilterSpec> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if numeric {
        let (op, rest) = if let Some(r) = trimmed.strip_prefix(">=") {
            (NumberFilterOp::GreaterThanOrEqual, r)
        } else if let Some(r) = trimmed.strip_prefix("<=") {
            (NumberFilterOp::LessThanOrEqual, r)
        } else if let Some(r) = trimmed.strip_prefix("!=") {
            (NumberFilterOp::NotEqual, r)
        } else if let Some(r) = trimmed.strip_prefix('>') {
            (NumberFilterOp::GreaterThan, r)
        } else if let Some(r) = trimmed.strip_prefix('<') {
            (NumberFilterOp::LessThan, r)
        } else if let Some(r) = trimmed.strip_prefix('=') {
            (NumberFilterOp::Equals, r)
        } else {
            (NumberFilterOp::Equals, trimmed)
        };
        let value: f64 = rest.trim().parse().ok()?;
        Some(FilterSpec::Number { op, value })
    } else {
        let (op, value) = if let Some(r) = trimmed.strip_prefix("!=") {
            (TextFilterOp::NotEqual, r.trim_start())
        } else if let Some(r) = trimmed.strip_prefix("!~") {
            (TextFilterOp::NotContains, r.trim_start())
        } else if let Some(r) = trimmed.strip_prefix('=') {
            (TextFilterOp::Equals, r.trim_start())
        } else if let Some(r) = trimmed.strip_prefix('^') {
            (TextFilterOp::StartsWith, r)
        } else if let Some(r) = trimmed.strip_suffix('$') {
            (TextFilterOp::EndsWith, r)
        } else {
            (TextFilterOp::Contains, trimmed)
        };
        Some(FilterSpec::Text {
            op,
            value: value.to_string(),
        })
    }
}

/// The render half of the grid.
pub struct DataTable {
    alternate_row_bg: Option<Color>,
    cell_padding: u16,
    empty_message: String,
    empty_submessage: String,
}

impl DataTable {
    pub fn new(alternate_row_shading: bool) -> Self {
        Self {
            alternate_row_bg: alternate_row_shading.then_some(Color::Indexed(235)),
            cell_padding: 2,
            empty_message: "No rows".to_string(),
            empty_submessage: String::new(),
        }
    }

    pub fn empty_message(mut self, message: impl Into<String>, submessage: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self.empty_submessage = submessage.into();
        self
    }

    fn render_dataframe(
        &self,
        df: &DataFrame,
        state: &mut DataTableState,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let (height, cols) = df.shape();

        if state.selected_col < state.first_visible_col {
            state.first_visible_col = state.selected_col;
        }

        let first_col = state.first_visible_col.min(cols.saturating_sub(1));
        let names = df.get_column_names();

        // Fit columns to content width, starting at the horizontal offset.
        let mut widths: Vec<u16> = Vec::new();
        let mut rows: Vec<Vec<Cell>> = vec![vec![]; height.min(state.visible_rows.max(1))];
        let mut used_width = 0u16;
        let mut visible_columns = 0usize;

        for col_index in first_col..cols {
            let name = names[col_index].as_str();
            let indicator = state.sort_indicator(name).unwrap_or("");
            let mut max_len = (name.chars().count() + indicator.len()) as u16;
            let col_data = &df[col_index];

            for (row_index, row) in rows.iter_mut().enumerate() {
                let val_str: Cow<str> = match col_data.get(row_index) {
                    Ok(AnyValue::Null) | Err(_) => Cow::Borrowed(""),
                    Ok(value) => Cow::Owned(value.str_value().into_owned()),
                };
                max_len = max_len.max(val_str.chars().count() as u16);
                row.push(Cell::from(Line::from(val_str.into_owned())));
            }

            if used_width + max_len > area.width {
                break;
            }
            visible_columns += 1;
            widths.push(max_len);
            used_width += max_len + self.cell_padding;
        }

        // Selected column off the right edge: slide the window one column
        // for the next frame (converges across renders).
        if state.selected_col >= first_col + visible_columns.max(1) {
            state.first_visible_col += 1;
        }

        let rows: Vec<Row> = rows
            .into_iter()
            .enumerate()
            .map(|(row_index, mut row)| {
                row.truncate(visible_columns);
                let row_style = if row_index % 2 == 1 {
                    self.alternate_row_bg
                        .map(|c| Style::default().bg(c))
                        .unwrap_or_default()
                } else {
                    Style::default()
                };
                Row::new(row).style(row_style)
            })
            .collect();

        let headers: Vec<Cell> = (first_col..first_col + visible_columns)
            .map(|col_index| {
                let name = names[col_index].as_str();
                let indicator = state.sort_indicator(name).unwrap_or("");
                let mut style = Style::default().add_modifier(Modifier::BOLD);
                if col_index == state.selected_col {
                    style = style.add_modifier(Modifier::UNDERLINED).fg(Color::Cyan);
                }
                let mut text = name.to_string();
                text.push_str(indicator);
                if state.filter_for(name).is_some() {
                    text.push('*');
                }
                Cell::from(Span::styled(text, style))
            })
            .collect();

        StatefulWidget::render(
            Table::new(rows, widths)
                .column_spacing(self.cell_padding)
                .header(Row::new(headers))
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            area,
            buf,
            &mut state.table_state,
        );
    }
}

impl StatefulWidget for DataTable {
    type State = DataTableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(state.title());
        let inner = block.inner(area);
        block.render(area, buf);
        // One line for the header row.
        state.visible_rows = inner.height.saturating_sub(1) as usize;

        match state.visible_slice() {
            Some(df) if df.height() > 0 => self.render_dataframe(&df, state, inner, buf),
            _ => {
                let lines = vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        self.empty_message.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(self.empty_submessage.clone()),
                ];
                Paragraph::new(lines)
                    .centered()
                    .render(inner, buf);
            }
        }
    }
}
