//! chatline-core: conversation services and the session state machine
//!
//! Holds the API key and completion client caches, the conversation entity
//! and its repository, the orchestrator that runs one question/answer round,
//! and the session that sequences the screens.

pub mod client;
pub mod conversation;
pub mod credential;
pub mod error;
pub mod orchestrator;
pub mod repository;
pub mod session;

#[cfg(test)]
mod testing;

pub use client::{ClientFactory, CompletionClientCache, OpenAIFactory};
pub use conversation::{Conversation, FinishReason, Message};
pub use credential::{ApiKey, CredentialCache, FileKeyStore, KeyStore};
pub use error::{Error, Result};
pub use orchestrator::{ConverseOptions, DEFAULT_MAX_TOKENS, Orchestrator};
pub use repository::ConversationRepository;
pub use session::{Outcome, PickerEntry, Services, Session, SessionEvent, SessionSettings, State};
