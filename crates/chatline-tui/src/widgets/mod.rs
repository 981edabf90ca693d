//! Custom widgets for the TUI

pub mod input_box;
pub mod picker;
pub mod status;
pub mod transcript;

pub use input_box::InputBox;
pub use picker::{Picker, PickerItem, PickerState};
pub use status::StatusLine;
pub use transcript::{Ending, Speaker, Transcript, TranscriptEntry};
