//! Screen-to-screen navigation of one interactive session
//!
//! The session walks the user from the API key check through picking a
//! conversation (or starting one with a model and a system prompt) into the
//! chat, and from there to saving. Collaborator failures are queued for the
//! UI instead of aborting a transition.

use std::sync::Arc;

use tracing::debug;

use crate::client::CompletionClientCache;
use crate::conversation::{Conversation, Message};
use crate::credential::{ApiKey, CredentialCache};
use crate::error::Error;
use crate::orchestrator::Orchestrator;
use crate::repository::ConversationRepository;

/// System prompt used when the user submits an empty one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// Columns and rows taken by the margin around full-screen lists
pub const FRAME_MARGIN: (u16, u16) = (4, 2);

/// Which screen is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Key,
    ConversationPicker,
    ModelPicker,
    SystemPrompt,
    Chat,
    Save,
    Quit,
}

/// Input delivered to the session by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Submit(String),
    Select(usize),
    Back,
    Save,
    Quit,
    Resize { width: u16, height: u16 },
    Tick,
}

/// What happened to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Handled; the UI may clear its input
    Accepted,
    /// Handled but refused; the UI keeps its input
    Rejected,
    /// Not meaningful in the current state
    Ignored,
}

/// One row of the conversation picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEntry {
    NewConversation,
    Existing {
        id: String,
        name: String,
        last_model: String,
    },
}

impl PickerEntry {
    pub fn title(&self) -> &str {
        match self {
            PickerEntry::NewConversation => "New conversation",
            PickerEntry::Existing { id, name, .. } if name.is_empty() => id,
            PickerEntry::Existing { name, .. } => name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            PickerEntry::NewConversation => "Choose your model",
            PickerEntry::Existing { last_model, .. } => last_model,
        }
    }

    fn from_conversation(conversation: &Conversation) -> Self {
        PickerEntry::Existing {
            id: conversation.id().to_string(),
            name: conversation.name().to_string(),
            last_model: conversation.last_model().to_string(),
        }
    }
}

/// User-facing knobs
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Models offered when starting a conversation
    pub models: Vec<String>,
    pub system_prompt: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            models: chatline_ai::models::default_models(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Services the session drives
pub struct Services {
    pub credentials: Arc<CredentialCache>,
    pub clients: Arc<CompletionClientCache>,
    pub repository: Arc<ConversationRepository>,
    pub orchestrator: Orchestrator,
}

/// The session state machine
pub struct Session {
    services: Services,
    settings: SessionSettings,
    state: State,
    entries: Vec<PickerEntry>,
    conversation: Option<Conversation>,
    pending_model: Option<String>,
    transcript: Vec<Message>,
    list_size: (u16, u16),
    errors: Vec<Error>,
}

impl Session {
    pub fn new(services: Services, settings: SessionSettings) -> Self {
        Self {
            services,
            settings,
            state: State::Start,
            entries: Vec::new(),
            conversation: None,
            pending_model: None,
            transcript: Vec::new(),
            list_size: (0, 0),
            errors: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Quit
    }

    /// Conversation picker rows, the new-conversation entry first
    pub fn entries(&self) -> &[PickerEntry] {
        &self.entries
    }

    pub fn models(&self) -> &[String] {
        &self.settings.models
    }

    pub fn system_prompt(&self) -> &str {
        &self.settings.system_prompt
    }

    /// Conversation being created or chatted in
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// Messages shown on the chat screen
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Space available to full-screen lists
    pub fn list_size(&self) -> (u16, u16) {
        self.list_size
    }

    /// Take every error queued since the last call
    pub fn drain_errors(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }

    /// Check the API key and open the first real screen
    pub async fn start(&mut self) {
        match self.services.credentials.get() {
            Ok(_) => self.enter_conversation_picker().await,
            Err(e) => {
                self.record(e);
                self.state = State::Key;
            }
        }
    }

    /// Handle one event
    pub async fn update(&mut self, event: SessionEvent) -> Outcome {
        match event {
            SessionEvent::Quit => {
                self.state = State::Quit;
                return Outcome::Accepted;
            }
            SessionEvent::Resize { width, height } => {
                self.list_size = (
                    width.saturating_sub(FRAME_MARGIN.0),
                    height.saturating_sub(FRAME_MARGIN.1),
                );
                return Outcome::Ignored;
            }
            SessionEvent::Tick => return Outcome::Ignored,
            _ => {}
        }

        if self.state == State::Start {
            self.start().await;
        }

        match self.state {
            State::Start | State::Quit => Outcome::Ignored,
            State::Key => self.update_key(event).await,
            State::ConversationPicker => self.update_conversation_picker(event).await,
            State::ModelPicker => self.update_model_picker(event).await,
            State::SystemPrompt => self.update_system_prompt(event),
            State::Chat => self.update_chat(event).await,
            State::Save => self.update_save(event).await,
        }
    }

    async fn update_key(&mut self, event: SessionEvent) -> Outcome {
        let SessionEvent::Submit(text) = event else {
            return Outcome::Ignored;
        };
        let key = match ApiKey::parse(&text) {
            Ok(key) => key,
            Err(e) => {
                self.record(e);
                return Outcome::Rejected;
            }
        };
        if let Err(e) = self.services.credentials.create(key.as_str()) {
            self.record(e);
            return Outcome::Rejected;
        }
        self.services.credentials.invalidate();
        self.services.clients.invalidate();
        self.enter_conversation_picker().await;
        Outcome::Accepted
    }

    async fn update_conversation_picker(&mut self, event: SessionEvent) -> Outcome {
        let SessionEvent::Select(index) = event else {
            return Outcome::Ignored;
        };
        let Some(entry) = self.entries.get(index).cloned() else {
            return Outcome::Ignored;
        };
        match entry {
            PickerEntry::NewConversation => {
                self.conversation = Some(Conversation::new());
                self.pending_model = None;
                self.state = State::ModelPicker;
                Outcome::Accepted
            }
            PickerEntry::Existing { id, .. } => {
                match self.services.repository.get_conversation(&id).await {
                    Ok(conversation) => {
                        self.enter_chat(conversation);
                        Outcome::Accepted
                    }
                    Err(e) => {
                        self.record(e);
                        Outcome::Rejected
                    }
                }
            }
        }
    }

    async fn update_model_picker(&mut self, event: SessionEvent) -> Outcome {
        match event {
            SessionEvent::Select(index) => {
                let Some(model) = self.settings.models.get(index) else {
                    return Outcome::Ignored;
                };
                self.pending_model = Some(model.clone());
                self.state = State::SystemPrompt;
                Outcome::Accepted
            }
            SessionEvent::Back => {
                self.enter_conversation_picker().await;
                Outcome::Accepted
            }
            _ => Outcome::Ignored,
        }
    }

    fn update_system_prompt(&mut self, event: SessionEvent) -> Outcome {
        match event {
            SessionEvent::Submit(text) => {
                let Some(mut conversation) = self.conversation.take() else {
                    return Outcome::Ignored;
                };
                let prompt = if text.trim().is_empty() {
                    self.settings.system_prompt.clone()
                } else {
                    text
                };
                conversation.push(Message::system(prompt));
                if let Some(model) = self.pending_model.take() {
                    conversation.set_last_model(model);
                }
                self.enter_chat(conversation);
                Outcome::Accepted
            }
            SessionEvent::Back => {
                self.state = State::ModelPicker;
                Outcome::Accepted
            }
            _ => Outcome::Ignored,
        }
    }

    async fn update_chat(&mut self, event: SessionEvent) -> Outcome {
        match event {
            SessionEvent::Submit(text) => {
                if text.trim().is_empty() {
                    return Outcome::Ignored;
                }
                let Some(conversation) = self.conversation.as_mut() else {
                    return Outcome::Ignored;
                };
                match self.services.orchestrator.converse(conversation, &text).await {
                    Ok(_) => {
                        let messages = conversation.messages();
                        let new = &messages[messages.len().saturating_sub(2)..];
                        self.transcript.extend_from_slice(new);
                        Outcome::Accepted
                    }
                    Err(e) => {
                        if e.is_auth() {
                            self.services.clients.invalidate();
                            self.services.credentials.invalidate();
                        }
                        self.record(e);
                        Outcome::Rejected
                    }
                }
            }
            SessionEvent::Save => {
                self.state = State::Save;
                Outcome::Accepted
            }
            SessionEvent::Back => {
                self.state = State::SystemPrompt;
                Outcome::Accepted
            }
            _ => Outcome::Ignored,
        }
    }

    async fn update_save(&mut self, event: SessionEvent) -> Outcome {
        match event {
            SessionEvent::Submit(name) => {
                if let Some(mut conversation) = self.conversation.take() {
                    if !name.trim().is_empty() {
                        conversation.set_name(name.trim());
                    }
                    if let Err(e) = self
                        .services
                        .repository
                        .save_conversation(&mut conversation)
                        .await
                    {
                        self.record(e);
                    }
                }
                self.enter_conversation_picker().await;
                Outcome::Accepted
            }
            SessionEvent::Back => {
                self.state = State::Chat;
                Outcome::Accepted
            }
            _ => Outcome::Ignored,
        }
    }

    async fn enter_conversation_picker(&mut self) {
        self.conversation = None;
        self.pending_model = None;
        self.transcript.clear();
        self.entries = vec![PickerEntry::NewConversation];
        match self.services.repository.list_conversations().await {
            Ok(conversations) => self
                .entries
                .extend(conversations.iter().map(PickerEntry::from_conversation)),
            Err(e) => self.record(e),
        }
        self.state = State::ConversationPicker;
    }

    fn enter_chat(&mut self, conversation: Conversation) {
        self.transcript = conversation.messages().to_vec();
        self.conversation = Some(conversation);
        self.state = State::Chat;
    }

    fn record(&mut self, error: Error) {
        debug!(state = ?self.state, error = %error, "queued session error");
        self.errors.push(error);
    }
}
