//! Text input widget

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

/// Single-line text input widget
#[derive(Debug, Default)]
pub struct InputBox {
    /// Current input text
    content: String,
    /// Cursor position (character index, not byte index)
    cursor: usize,
    /// Horizontal scroll offset (in display width)
    scroll: usize,
    placeholder: String,
    /// Title drawn on the border
    title: String,
    /// Maximum number of characters, 0 for unlimited
    char_limit: usize,
    focused: bool,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text shown dimmed while the box is empty
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Characters beyond the limit are dropped, typed or pasted
    pub fn with_char_limit(mut self, limit: usize) -> Self {
        self.char_limit = limit;
        self
    }

    /// A focused box draws its cursor and an accent border
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Get the current content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Clear the content
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    fn is_full(&self) -> bool {
        self.char_limit > 0 && self.content.chars().count() >= self.char_limit
    }

    /// Get the byte offset for the current cursor position
    fn cursor_byte_offset(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    /// Get the display width of text before the cursor
    fn cursor_display_width(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.to_string().width())
            .sum()
    }

    /// Byte range of the character under the cursor
    fn char_at_cursor(&self) -> std::ops::Range<usize> {
        let start = self.cursor_byte_offset();
        let end = self.content[start..]
            .char_indices()
            .nth(1)
            .map(|(i, _)| start + i)
            .unwrap_or(self.content.len());
        start..end
    }

    /// Handle an editing action. Returns whether the input changed or moved.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let char_count = self.content.chars().count();

        match action {
            Action::Char(c) => {
                let inserted = self.insert_char(*c);
                self.update_scroll(width as usize);
                inserted
            }
            Action::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let range = self.char_at_cursor();
                    self.content.drain(range);
                    self.update_scroll(width as usize);
                    true
                } else {
                    false
                }
            }
            Action::Delete => {
                if self.cursor < char_count {
                    let range = self.char_at_cursor();
                    self.content.drain(range);
                    true
                } else {
                    false
                }
            }
            Action::Left => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.update_scroll(width as usize);
                    true
                } else {
                    false
                }
            }
            Action::Right => {
                if self.cursor < char_count {
                    self.cursor += 1;
                    self.update_scroll(width as usize);
                    true
                } else {
                    false
                }
            }
            Action::Home => {
                self.cursor = 0;
                self.update_scroll(width as usize);
                true
            }
            Action::End => {
                self.cursor = char_count;
                self.update_scroll(width as usize);
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let mut new_cursor = self.cursor;
                let chars: Vec<char> = self.content.chars().collect();

                // Skip trailing spaces
                while new_cursor > 0 && chars.get(new_cursor - 1) == Some(&' ') {
                    new_cursor -= 1;
                }
                // Skip word characters
                while new_cursor > 0 && chars.get(new_cursor - 1) != Some(&' ') {
                    new_cursor -= 1;
                }

                let start_byte = self
                    .content
                    .char_indices()
                    .nth(new_cursor)
                    .map(|(i, _)| i)
                    .unwrap_or(self.content.len());
                let end_byte = self.cursor_byte_offset();

                self.content.drain(start_byte..end_byte);
                self.cursor = new_cursor;
                self.update_scroll(width as usize);
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    // Single line: newlines become spaces, \r\n only once
                    if c == '\n' || c == '\r' {
                        if !self.content.ends_with(' ') && self.cursor > 0 {
                            self.insert_char(' ');
                        }
                    } else {
                        self.insert_char(c);
                    }
                }
                self.update_scroll(width as usize);
                true
            }
            _ => false,
        }
    }

    fn insert_char(&mut self, c: char) -> bool {
        if self.is_full() {
            return false;
        }
        let byte_offset = self.cursor_byte_offset();
        self.content.insert(byte_offset, c);
        self.cursor += 1;
        true
    }

    fn update_scroll(&mut self, width: usize) {
        let visible_width = width.saturating_sub(4); // Account for borders/padding
        let cursor_pos = self.cursor_display_width();

        if cursor_pos < self.scroll {
            self.scroll = cursor_pos;
        } else if cursor_pos >= self.scroll + visible_width {
            self.scroll = cursor_pos - visible_width + 1;
        }
    }

    /// Render the input box
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.focused {
                theme.accent_style()
            } else {
                theme.border_style()
            });
        if !self.title.is_empty() {
            block = block
                .title(format!(" {} ", self.title))
                .title_style(theme.accent_bold());
        }

        let inner = block.inner(area);
        block.render(area, buf);

        let display_text = if self.content.is_empty() {
            self.placeholder.clone()
        } else {
            let visible_width = inner.width as usize;
            let chars: Vec<char> = self.content.chars().collect();
            let mut start_idx = 0;
            let mut current_width = 0;

            // Find start position based on scroll
            for (i, c) in chars.iter().enumerate() {
                if current_width >= self.scroll {
                    start_idx = i;
                    break;
                }
                current_width += c.to_string().width();
            }

            let mut visible = String::new();
            current_width = 0;
            for c in chars.iter().skip(start_idx) {
                let char_width = c.to_string().width();
                if current_width + char_width > visible_width {
                    break;
                }
                visible.push(*c);
                current_width += char_width;
            }
            visible
        };

        let style = if self.content.is_empty() {
            theme.dim_style()
        } else {
            theme.base_style()
        };
        Paragraph::new(display_text).style(style).render(inner, buf);

        if self.focused && inner.width > 0 {
            let cursor_x = self.cursor_display_width().saturating_sub(self.scroll);
            if cursor_x < inner.width as usize {
                let x = inner.x + cursor_x as u16;
                if let Some(cell) = buf.cell_mut((x, inner.y)) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(input: &mut InputBox, text: &str) {
        for c in text.chars() {
            input.handle_action(&Action::Char(c), 40);
        }
    }

    #[test]
    fn test_char_limit() {
        let mut input = InputBox::new().with_char_limit(5);
        typed(&mut input, "abcdefg");
        assert_eq!(input.content(), "abcde");
        assert!(!input.handle_action(&Action::Char('x'), 40));

        input.handle_action(&Action::Paste("zz".into()), 40);
        assert_eq!(input.content(), "abcde");
    }

    #[test]
    fn test_editing_multibyte_text() {
        let mut input = InputBox::new();
        typed(&mut input, "héllo");
        input.handle_action(&Action::Left, 40);
        input.handle_action(&Action::Backspace, 40);
        assert_eq!(input.content(), "hélo");

        input.handle_action(&Action::Home, 40);
        input.handle_action(&Action::Delete, 40);
        assert_eq!(input.content(), "élo");
    }

    #[test]
    fn test_delete_word_and_clear() {
        let mut input = InputBox::new();
        typed(&mut input, "hello big world");
        input.handle_action(&Action::DeleteWord, 40);
        assert_eq!(input.content(), "hello big ");

        input.handle_action(&Action::ClearLine, 40);
        assert_eq!(input.content(), "");
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut input = InputBox::new();
        input.handle_action(&Action::Paste("one\r\ntwo".into()), 40);
        assert_eq!(input.content(), "one two");
    }

    #[test]
    fn test_navigation_keys_are_not_consumed() {
        let mut input = InputBox::new();
        assert!(!input.handle_action(&Action::Up, 40));
        assert!(!input.handle_action(&Action::Submit, 40));
    }
}
