//! One question/answer round against the completion API

use std::sync::Arc;

use chatline_ai::{ChatMessage, CompletionRequest};
use tracing::debug;

use crate::client::CompletionClientCache;
use crate::conversation::{Conversation, FinishReason, Message};
use crate::error::{Error, Result};

/// Response length cap when nothing else is configured
pub const DEFAULT_MAX_TOKENS: u32 = 100;

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct ConverseOptions {
    pub max_tokens: Option<u32>,
    /// Talk to this model instead of the conversation's last one
    pub model: Option<String>,
}

/// Sends a conversation plus a new question and records the answer
pub struct Orchestrator {
    clients: Arc<CompletionClientCache>,
    max_tokens: u32,
}

impl Orchestrator {
    pub fn new(clients: Arc<CompletionClientCache>) -> Self {
        Self {
            clients,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn converse(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
    ) -> Result<FinishReason> {
        self.converse_with(conversation, user_text, ConverseOptions::default())
            .await
    }

    /// Ask `user_text` and append the question and the first candidate.
    ///
    /// The conversation is only touched once a candidate exists.
    pub async fn converse_with(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        options: ConverseOptions,
    ) -> Result<FinishReason> {
        let mut messages = conversation.outbound_messages();
        messages.push(ChatMessage::user(user_text));

        let client = self.clients.get()?;

        let model = options
            .model
            .clone()
            .unwrap_or_else(|| conversation.last_model().to_string());
        let request = CompletionRequest {
            model: model.clone(),
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
            messages,
        };

        let response = client
            .complete(&request)
            .await
            .map_err(Error::CompletionFailed)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(Error::CompletionFailed(chatline_ai::Error::EmptyResponse))?;

        let finish_reason = FinishReason::from(choice.finish_reason);
        debug!(model = %model, ?finish_reason, "completion received");

        conversation.push(Message::user(user_text));
        conversation.push(Message::assistant(
            choice.message.content,
            finish_reason,
            model.clone(),
        ));
        if options.model.is_some() {
            conversation.set_last_model(model);
        }
        Ok(finish_reason)
    }
}
