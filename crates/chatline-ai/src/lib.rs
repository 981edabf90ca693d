//! chatline-ai: chat completion API layer
//!
//! Request/response types for a chat-completions style API, the error type
//! shared by every client, and an OpenAI-compatible HTTP client.

pub mod error;
pub mod models;
pub mod providers;
pub mod types;

pub use error::{Error, Result};
pub use providers::CompletionClient;
pub use types::*;
