//! Path prompt shown while no file is loaded (the terminal stand-in for a
//! drop zone): type or paste a path to a .parquet file and press Enter.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Widget},
};
use std::path::PathBuf;
use tui_textarea::TextArea;

use super::input::key_event_to_input;

pub enum PromptEvent {
    None,
    Submit(PathBuf),
}

pub struct FilePrompt {
    input: TextArea<'static>,
}

impl FilePrompt {
    pub fn new() -> Self {
        let mut input = TextArea::default();
        input.set_cursor_line_style(Style::default());
        Self { input }
    }

    pub fn clear(&mut self) {
        self.input = TextArea::default();
        self.input.set_cursor_line_style(Style::default());
    }

    pub fn input(&mut self, key: KeyEvent) -> PromptEvent {
        match key.code {
            KeyCode::Enter => {
                let text = self.input.lines().join("").trim().to_string();
                if text.is_empty() {
                    PromptEvent::None
                } else {
                    PromptEvent::Submit(PathBuf::from(text))
                }
            }
            _ => {
                self.input.input(key_event_to_input(&key));
                PromptEvent::None
            }
        }
    }
}

impl Default for FilePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &FilePrompt {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Open Parquet file ");
        let inner = block.inner(area);
        block.render(area, buf);

        let hint = Line::from("Path to a .parquet file, then Enter")
            .style(Style::default().add_modifier(Modifier::DIM));

        if inner.height >= 2 {
            Paragraph::new(hint).render(
                Rect {
                    y: inner.y + inner.height - 1,
                    height: 1,
                    ..inner
                },
                buf,
            );
            self.input.render(
                Rect {
                    height: inner.height - 1,
                    ..inner
                },
                buf,
            );
        } else {
            self.input.render(inner, buf);
        }
    }
}
