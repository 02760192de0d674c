//! Multi-line SQL input wrapping tui-textarea. Enter inserts a newline;
//! Ctrl-R (or Ctrl-Enter where the terminal delivers it) runs the query.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Widget},
};
use tui_textarea::TextArea;

use super::input::key_event_to_input;

pub const DEFAULT_QUERY: &str = "SELECT * FROM parquet_file LIMIT 100";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    None,
    Run,
    Cancel,
}

pub struct SqlEditor {
    textarea: TextArea<'static>,
    focused: bool,
}

impl SqlEditor {
    pub fn new() -> Self {
        let mut textarea = TextArea::from([DEFAULT_QUERY]);
        textarea.set_cursor_line_style(Style::default());
        Self {
            textarea,
            focused: false,
        }
    }

    pub fn text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn input(&mut self, key: KeyEvent) -> EditorEvent {
        match (key.code, key.modifiers) {
            (KeyCode::Char('r'), KeyModifiers::CONTROL)
            | (KeyCode::Enter, KeyModifiers::CONTROL) => EditorEvent::Run,
            (KeyCode::Esc, _) => EditorEvent::Cancel,
            _ => {
                self.textarea.input(key_event_to_input(&key));
                EditorEvent::None
            }
        }
    }
}

impl Default for SqlEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &SqlEditor {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let title = if self.focused {
            " SQL (ctrl-r: run, esc: back) "
        } else {
            " SQL (e: edit) "
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);
        let inner = block.inner(area);
        block.render(area, buf);

        // tui-textarea renders its own cursor; dim it when unfocused.
        let mut textarea = self.textarea.clone();
        if !self.focused {
            textarea.set_cursor_style(Style::default());
        } else {
            textarea.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        }
        textarea.render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_default_query() {
        let editor = SqlEditor::new();
        assert_eq!(editor.text(), DEFAULT_QUERY);
    }

    #[test]
    fn ctrl_r_runs_and_esc_cancels() {
        let mut editor = SqlEditor::new();
        assert_eq!(
            editor.input(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL)),
            EditorEvent::Run
        );
        assert_eq!(
            editor.input(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            EditorEvent::Cancel
        );
    }

    #[test]
    fn typed_keys_edit_the_text() {
        let mut editor = SqlEditor::new();
        editor.input(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(editor.text().contains('x'));
        editor.input(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(editor.text(), DEFAULT_QUERY);
    }
}
