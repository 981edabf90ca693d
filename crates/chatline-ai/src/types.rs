//! Core types for chat completion requests

use serde::{Deserialize, Serialize};

/// Message roles understood by the completion API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Get the role as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of response
    Stop,
    /// Maximum tokens reached
    Length,
    /// Output withheld by the provider's content filter
    ContentFilter,
    /// No reason reported (or one this client does not know)
    #[serde(other)]
    Null,
}

impl FinishReason {
    /// Map the raw `finish_reason` field of a completion choice
    pub fn from_api(raw: Option<&str>) -> Self {
        match raw {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Null,
        }
    }
}

/// A single message as sent to or received from the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Model identifier (e.g., "gpt-3.5-turbo")
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Conversation so far, oldest first
    pub messages: Vec<ChatMessage>,
}

/// One candidate completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionChoice {
    pub message: ChatMessage,
    pub finish_reason: FinishReason,
}

/// A completion response; candidates are ranked, best first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

impl CompletionResponse {
    /// The top-ranked candidate, if any
    pub fn first(&self) -> Option<&CompletionChoice> {
        self.choices.first()
    }
}
