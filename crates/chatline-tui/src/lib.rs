//! chatline-tui: terminal UI components
//!
//! Key mapping, a single-line input box, a full-screen picker list, the chat
//! transcript, a status line and the terminal guard, built on ratatui and
//! crossterm.

pub mod app;
pub mod input;
pub mod theme;
pub mod widgets;

pub use app::App;
pub use theme::Theme;
