//! Sidebar panel listing the active view's columns. Replaced wholesale
//! whenever the active view changes.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, Widget},
};

use crate::engine::ColumnInfo;

pub struct SchemaPanel<'a> {
    columns: &'a [ColumnInfo],
}

impl<'a> SchemaPanel<'a> {
    pub fn new(columns: &'a [ColumnInfo]) -> Self {
        Self { columns }
    }
}

impl Widget for SchemaPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Schema ({} columns) ", self.columns.len()));

        let rows: Vec<Row> = self
            .columns
            .iter()
            .map(|col| {
                let type_style = if col.looks_temporal() {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Row::new(vec![
                    Cell::from(col.name.clone()),
                    Cell::from(col.dtype.clone()).style(type_style),
                ])
            })
            .collect();

        let widths = [Constraint::Percentage(60), Constraint::Percentage(40)];
        let table = Table::new(rows, widths)
            .header(
                Row::new(vec!["name", "type"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(block);
        Widget::render(table, area, buf);
    }
}
