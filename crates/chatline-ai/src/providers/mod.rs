//! Completion API clients

pub mod openai;

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for chat completion clients
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issue one non-streaming completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}
