//! One-line status bar: key hints, or the latest error

use crate::theme::Theme;
use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};

/// Status line widget
pub struct StatusLine<'a> {
    hint: &'a str,
    error: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> StatusLine<'a> {
    pub fn new(hint: &'a str, theme: &'a Theme) -> Self {
        Self {
            hint,
            error: None,
            theme,
        }
    }

    /// Show an error instead of the hint
    pub fn error(mut self, error: Option<&'a str>) -> Self {
        self.error = error;
        self
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let span = match self.error {
            Some(error) => Span::styled(format!("✗ {error}"), self.theme.error_style()),
            None => Span::styled(self.hint.to_string(), self.theme.dim_style()),
        };
        buf.set_span(area.x, area.y, &span, area.width);
    }
}
