//! Conversation entity and its stored document shape

use chatline_ai::{ChatMessage, Role};
use serde::{Deserialize, Serialize};

/// Why a message ended, as stored with the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    /// Authored by the user (questions and the system prompt)
    #[serde(rename = "")]
    UserEcho,
    #[serde(other)]
    Null,
}

impl From<chatline_ai::FinishReason> for FinishReason {
    fn from(reason: chatline_ai::FinishReason) -> Self {
        match reason {
            chatline_ai::FinishReason::Stop => FinishReason::Stop,
            chatline_ai::FinishReason::Length => FinishReason::Length,
            chatline_ai::FinishReason::ContentFilter => FinishReason::ContentFilter,
            chatline_ai::FinishReason::Null => FinishReason::Null,
        }
    }
}

/// One entry of a conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub finish_reason: FinishReason,
    /// Model that produced the message, empty for user-authored ones
    #[serde(default)]
    pub model: String,
}

impl Message {
    /// A question typed by the user
    pub fn user(content: impl Into<String>) -> Self {
        Self::authored(Role::User, content)
    }

    /// The system prompt
    pub fn system(content: impl Into<String>) -> Self {
        Self::authored(Role::System, content)
    }

    /// A completion candidate
    pub fn assistant(
        content: impl Into<String>,
        finish_reason: FinishReason,
        model: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            finish_reason,
            model: model.into(),
        }
    }

    fn authored(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            finish_reason: FinishReason::UserEcho,
            model: String::new(),
        }
    }

    /// Role and content only, as sent to the completion API
    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

/// A named transcript plus the model it last talked to.
///
/// `dirty` tracks unsaved changes to the messages or the name; it is never
/// persisted as true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    id: String,
    name: String,
    last_model: String,
    messages: Vec<Message>,
    dirty: bool,
}

impl Conversation {
    /// Fresh, clean conversation under a new random id
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            last_model: String::new(),
            messages: Vec::new(),
            dirty: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_model(&self) -> &str {
        &self.last_model
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.dirty = true;
    }

    /// Rename; only an actual change marks the conversation dirty
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.name {
            self.name = name;
            self.dirty = true;
        }
    }

    /// Record the model used last. Only messages and the name mark the
    /// conversation dirty.
    pub fn set_last_model(&mut self, model: impl Into<String>) {
        self.last_model = model.into();
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The transcript as completion API messages
    pub fn outbound_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(Message::to_chat).collect()
    }

    pub(crate) fn to_document(&self) -> ConversationDocument {
        ConversationDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            last_model: self.last_model.clone(),
            has_change: false,
            messages: self.messages.clone(),
        }
    }

    /// Rebuild from a stored document. The stored change flag is ignored.
    pub(crate) fn from_document(doc: ConversationDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            last_model: doc.last_model,
            messages: doc.messages,
            dirty: false,
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Stored shape of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationDocument {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_model: String,
    #[serde(default)]
    pub has_change: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
}
