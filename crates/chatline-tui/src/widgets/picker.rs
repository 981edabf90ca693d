//! Full-screen list for choosing a conversation or a model

use crate::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, HighlightSpacing, List, ListItem, ListState, StatefulWidget},
};

/// One row of the picker
pub struct PickerItem<'a> {
    pub title: &'a str,
    pub description: &'a str,
}

/// Selection and size of a picker
#[derive(Debug, Default)]
pub struct PickerState {
    selected: usize,
    size: (u16, u16),
}

impl PickerState {
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn reset(&mut self) {
        self.selected = 0;
    }

    /// Area the list may occupy, from the last resize
    pub fn set_size(&mut self, width: u16, height: u16) {
        self.size = (width, height);
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    /// Move selection up, wrapping to the bottom
    pub fn up(&mut self, item_count: usize) {
        if item_count == 0 {
            return;
        }
        if self.selected > 0 {
            self.selected -= 1;
        } else {
            self.selected = item_count - 1;
        }
    }

    /// Move selection down, wrapping to the top
    pub fn down(&mut self, item_count: usize) {
        if item_count == 0 {
            return;
        }
        if self.selected < item_count - 1 {
            self.selected += 1;
        } else {
            self.selected = 0;
        }
    }

    /// Keep the selection inside a list that may have shrunk
    pub fn clamp(&mut self, item_count: usize) {
        self.selected = self.selected.min(item_count.saturating_sub(1));
    }
}

/// A titled list of two-line entries
pub struct Picker<'a> {
    title: &'a str,
    items: Vec<PickerItem<'a>>,
    theme: &'a Theme,
}

impl<'a> Picker<'a> {
    pub fn new(title: &'a str, items: Vec<PickerItem<'a>>, theme: &'a Theme) -> Self {
        Self {
            title,
            items,
            theme,
        }
    }

    /// Render within the state's size, inset by a one-row, two-column margin
    pub fn render(self, area: Rect, buf: &mut Buffer, state: &PickerState) {
        let framed = area.inner(Margin::new(2, 1));
        let (width, height) = state.size();
        let list_area = if width == 0 || height == 0 {
            framed
        } else {
            Rect::new(
                framed.x,
                framed.y,
                width.min(framed.width),
                height.min(framed.height),
            )
        };

        let block = Block::default()
            .title(format!(" {} ", self.title))
            .title_style(self.theme.accent_bold())
            .borders(Borders::ALL)
            .border_style(self.theme.border_style());

        let selected = state.selected().min(self.items.len().saturating_sub(1));
        let items: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| self.list_item(item, i == selected))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_spacing(HighlightSpacing::Always)
            .highlight_symbol("│ ");

        let mut list_state = ListState::default();
        if !self.items.is_empty() {
            list_state.select(Some(selected));
        }
        StatefulWidget::render(list, list_area, buf, &mut list_state);
    }

    fn list_item(&self, item: &PickerItem<'_>, is_selected: bool) -> ListItem<'static> {
        let (title_style, description_style) = if is_selected {
            (
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
                self.theme.accent_style(),
            )
        } else {
            (self.theme.base_style(), self.theme.dim_style())
        };
        ListItem::new(vec![
            Line::from(Span::styled(item.title.to_string(), title_style)),
            Line::from(Span::styled(item.description.to_string(), description_style)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_wraps() {
        let mut state = PickerState::default();
        state.up(3);
        assert_eq!(state.selected(), 2);
        state.down(3);
        assert_eq!(state.selected(), 0);
        state.down(0);
        assert_eq!(state.selected(), 0);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut state = PickerState::default();
        state.down(5);
        state.down(5);
        state.clamp(2);
        assert_eq!(state.selected(), 1);
        state.clamp(0);
        assert_eq!(state.selected(), 0);
    }

    #[test]
    fn test_render_shows_titles_and_descriptions() {
        let theme = Theme::dark();
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        let state = PickerState::default();

        Picker::new(
            "Conversations",
            vec![PickerItem {
                title: "New conversation",
                description: "Choose your model",
            }],
            &theme,
        )
        .render(area, &mut buf, &state);

        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Conversations"));
        assert!(text.contains("New conversation"));
        assert!(text.contains("Choose your model"));
    }
}
