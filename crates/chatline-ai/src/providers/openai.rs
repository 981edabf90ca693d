//! OpenAI Chat Completions API client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::CompletionClient;
use crate::{
    error::{Error, Result},
    types::{ChatMessage, CompletionChoice, CompletionRequest, CompletionResponse, FinishReason},
};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API client
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at an OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request<'a>(&self, request: &'a CompletionRequest) -> OpenAIRequest<'a> {
        OpenAIRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: &request.messages,
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(error_from_status(status.as_u16(), &text, retry_after));
        }

        let text = response.text().await?;
        parse_response(&text)
    }
}

/// Map a non-success HTTP status and body to an error
fn error_from_status(status: u16, body: &str, retry_after: Option<u64>) -> Error {
    let detail = serde_json::from_str::<OpenAIErrorEnvelope>(body)
        .map(|e| e.error)
        .ok();

    match status {
        401 => Error::Auth(
            detail
                .map(|d| d.message)
                .unwrap_or_else(|| "401 Unauthorized".to_string()),
        ),
        429 => Error::RateLimited { retry_after },
        _ => match detail {
            Some(d) => Error::api(d.error_type.unwrap_or_else(|| status.to_string()), d.message),
            None => Error::api(status.to_string(), body),
        },
    }
}

/// Parse a chat completions response body
fn parse_response(body: &str) -> Result<CompletionResponse> {
    let raw: OpenAIResponse = serde_json::from_str(body)?;

    let choices = raw
        .choices
        .into_iter()
        .map(|choice| {
            let message = choice
                .message
                .ok_or_else(|| Error::UnexpectedResponse("choice without message".to_string()))?;
            Ok(CompletionChoice {
                message: ChatMessage {
                    role: message.role,
                    content: message.content.unwrap_or_default(),
                },
                finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CompletionResponse { choices })
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    role: crate::types::Role,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorEnvelope {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}
