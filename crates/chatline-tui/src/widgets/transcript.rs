//! Chat transcript widget

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// Who wrote a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    You,
    Ai,
    System,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Speaker::You => "You:",
            Speaker::Ai => "AI:",
            Speaker::System => "System:",
        }
    }
}

/// How an answer ended; decides the speaker color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Stop,
    Length,
    ContentFilter,
    Other,
}

/// A single message in the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub ending: Ending,
    pub content: String,
}

/// Widget showing the conversation, newest entries at the bottom
pub struct Transcript<'a> {
    entries: &'a [TranscriptEntry],
    theme: &'a Theme,
    /// Lines scrolled up from the bottom
    scroll_back: usize,
}

impl<'a> Transcript<'a> {
    pub fn new(entries: &'a [TranscriptEntry], theme: &'a Theme) -> Self {
        Self {
            entries,
            theme,
            scroll_back: 0,
        }
    }

    pub fn scroll_back(mut self, lines: usize) -> Self {
        self.scroll_back = lines;
        self
    }

    fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for entry in self.entries {
            let label = entry.speaker.label();
            let label_style = self.theme.speaker_style(entry.speaker, entry.ending);
            let indent = " ".repeat(label.len() + 1);
            let options = textwrap::Options::new(width.max(label.len() + 2))
                .initial_indent("")
                .subsequent_indent(&indent);

            // The label occupies the start of the first wrapped line
            let text = format!("{label} {}", entry.content);
            for (i, wrapped) in textwrap::wrap(&text, options).into_iter().enumerate() {
                if i == 0 {
                    let rest = wrapped.get(label.len()..).unwrap_or_default().to_string();
                    lines.push(Line::from(vec![
                        Span::styled(label, label_style),
                        Span::styled(rest, self.theme.base_style()),
                    ]));
                } else {
                    lines.push(Line::from(Span::styled(
                        wrapped.into_owned(),
                        self.theme.base_style(),
                    )));
                }
            }
        }
        lines
    }
}

impl Widget for Transcript<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let lines = self.lines(area.width as usize);
        let height = area.height as usize;
        let end = lines.len().saturating_sub(self.scroll_back.min(lines.len()));
        let start = end.saturating_sub(height);

        let visible: Vec<Line> = lines.into_iter().skip(start).take(end - start).collect();
        Paragraph::new(visible).render(area, buf);
    }
}

/// Number of lines the entries take at this width
pub fn transcript_height(entries: &[TranscriptEntry], theme: &Theme, width: usize) -> usize {
    Transcript::new(entries, theme).lines(width).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn entry(speaker: Speaker, ending: Ending, content: &str) -> TranscriptEntry {
        TranscriptEntry {
            speaker,
            ending,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_wraps_long_messages() {
        let theme = Theme::dark();
        let entries = vec![
            entry(Speaker::System, Ending::Other, "be brief"),
            entry(Speaker::You, Ending::Other, "one two three four five six seven"),
        ];
        assert_eq!(transcript_height(&entries, &theme, 80), 2);
        assert!(transcript_height(&entries, &theme, 16) > 2);
    }

    #[test]
    fn test_render_keeps_newest_lines() {
        let theme = Theme::dark();
        let entries: Vec<_> = (0..10)
            .map(|i| entry(Speaker::Ai, Ending::Stop, &format!("answer {i}")))
            .collect();
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);

        Transcript::new(&entries, &theme).render(area, &mut buf);

        let row = |y: u16| -> String {
            (0..area.width)
                .map(|x| buf.cell((x, y)).map(|c| c.symbol()).unwrap_or(""))
                .collect()
        };
        assert!(row(2).starts_with("AI: answer 9"));
        assert!(row(0).starts_with("AI: answer 7"));
        assert_eq!(buf.cell((0, 2)).unwrap().fg, Color::Green);
    }

    #[test]
    fn test_scroll_back() {
        let theme = Theme::dark();
        let entries: Vec<_> = (0..5)
            .map(|i| entry(Speaker::You, Ending::Other, &format!("q{i}")))
            .collect();
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);

        Transcript::new(&entries, &theme)
            .scroll_back(2)
            .render(area, &mut buf);
        assert_eq!(buf.cell((5, 0)).unwrap().symbol(), "q");
        assert_eq!(buf.cell((6, 0)).unwrap().symbol(), "2");
    }
}
