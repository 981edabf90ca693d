//! Lazily built completion client bound to the cached API key

use std::sync::Arc;

use chatline_ai::CompletionClient;
use chatline_ai::providers::openai::{DEFAULT_BASE_URL, OpenAIClient};
use parking_lot::Mutex;
use tracing::debug;

use crate::credential::{ApiKey, CredentialCache};
use crate::error::Result;

/// Builds a client for one API key
pub trait ClientFactory: Send + Sync {
    fn build(&self, key: &ApiKey) -> Arc<dyn CompletionClient>;
}

/// Builds [`OpenAIClient`]s against a fixed endpoint
#[derive(Debug, Clone)]
pub struct OpenAIFactory {
    base_url: String,
}

impl OpenAIFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for OpenAIFactory {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientFactory for OpenAIFactory {
    fn build(&self, key: &ApiKey) -> Arc<dyn CompletionClient> {
        Arc::new(OpenAIClient::new(key.as_str()).with_base_url(self.base_url.as_str()))
    }
}

/// Cached completion client
pub struct CompletionClientCache {
    credentials: Arc<CredentialCache>,
    factory: Box<dyn ClientFactory>,
    client: Mutex<Option<Arc<dyn CompletionClient>>>,
}

impl CompletionClientCache {
    pub fn new(credentials: Arc<CredentialCache>, factory: impl ClientFactory + 'static) -> Self {
        Self {
            credentials,
            factory: Box::new(factory),
            client: Mutex::new(None),
        }
    }

    /// Cached client, built from the current API key on first use
    pub fn get(&self) -> Result<Arc<dyn CompletionClient>> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let key = self.credentials.get()?;
        let client = self.factory.build(&key);
        debug!("built completion client");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drop the cached client. The API key stays cached.
    pub fn invalidate(&self) -> bool {
        let cleared = self.client.lock().take().is_some();
        debug!(cleared, "invalidated completion client");
        cleared
    }
}
