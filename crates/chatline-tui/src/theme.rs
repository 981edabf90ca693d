//! Color theme support

use ratatui::style::{Color, Modifier, Style};

use crate::widgets::transcript::{Ending, Speaker};

/// Color theme for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Primary text color
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (highlights, prompts)
    pub accent: Color,
    pub error: Color,
    pub border: Color,
    /// Speaker label of the user's messages
    pub user: Color,
    /// Speaker label of the system prompt
    pub system: Color,
    /// Answer cut off by the token limit
    pub length: Color,
    /// Answer that ended normally
    pub stop: Color,
    /// Answer withheld by the content filter
    pub content_filter: Color,
    /// Answer that ended for any other reason
    pub other: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            error: Color::Red,
            border: Color::DarkGray,
            user: Color::Magenta,
            system: Color::Green,
            length: Color::Yellow,
            stop: Color::Green,
            content_filter: Color::Red,
            other: Color::Blue,
        }
    }

    /// Get base style
    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Get dimmed style
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    /// Get accent style
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    /// Get bold accent style
    pub fn accent_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Get error style
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Get border style
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Style of a transcript speaker label
    pub fn speaker_style(&self, speaker: Speaker, ending: Ending) -> Style {
        let color = match (speaker, ending) {
            (Speaker::You, _) => self.user,
            (Speaker::System, _) => self.system,
            (Speaker::Ai, Ending::Stop) => self.stop,
            (Speaker::Ai, Ending::Length) => self.length,
            (Speaker::Ai, Ending::ContentFilter) => self.content_filter,
            (Speaker::Ai, Ending::Other) => self.other,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}
