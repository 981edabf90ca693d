//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chatline_ai::{
    ChatMessage, CompletionChoice, CompletionClient, CompletionRequest, CompletionResponse,
    FinishReason, Role,
};
use chatline_store::StoreConfig;
use chatline_store::StoreHandles;
use chatline_store::drivers::MemoryStore;
use parking_lot::Mutex;

use crate::client::ClientFactory;
use crate::credential::{ApiKey, KeyStore};

/// A well-formed API key
pub const VALID_KEY: &str = "sk-abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUV";

/// Key store kept in memory, counting reads
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    raw: Arc<Mutex<Option<String>>>,
    reads: Arc<AtomicUsize>,
}

impl MemoryKeyStore {
    pub fn with_key(raw: &str) -> Self {
        let store = Self::default();
        *store.raw.lock() = Some(raw.to_string());
        store
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().clone()
    }
}

impl KeyStore for MemoryKeyStore {
    fn read(&self) -> io::Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.raw.lock().clone())
    }

    fn write(&self, raw: &str) -> io::Result<()> {
        *self.raw.lock() = Some(raw.to_string());
        Ok(())
    }
}

/// Completion client replaying queued results and recording requests.
///
/// Once the queue is empty every call answers "ok" with `stop`.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    replies: Arc<Mutex<VecDeque<chatline_ai::Result<CompletionResponse>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedClient {
    pub fn push_reply(&self, content: &str, finish_reason: FinishReason) {
        self.replies.lock().push_back(Ok(reply(content, finish_reason)));
    }

    pub fn push_result(&self, result: chatline_ai::Result<CompletionResponse>) {
        self.replies.lock().push_back(result);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> chatline_ai::Result<CompletionResponse> {
        self.requests.lock().push(request.clone());
        let next = self.replies.lock().pop_front();
        next.unwrap_or_else(|| Ok(reply("ok", FinishReason::Stop)))
    }
}

/// Single-choice assistant response
pub fn reply(content: &str, finish_reason: FinishReason) -> CompletionResponse {
    CompletionResponse {
        choices: vec![CompletionChoice {
            message: ChatMessage::new(Role::Assistant, content),
            finish_reason,
        }],
    }
}

/// Factory handing out one shared [`ScriptedClient`]
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    client: ScriptedClient,
    built_with: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFactory {
    pub fn client(&self) -> ScriptedClient {
        self.client.clone()
    }

    /// Keys passed to `build`, in order
    pub fn built_with(&self) -> Vec<String> {
        self.built_with.lock().clone()
    }
}

impl ClientFactory for ScriptedFactory {
    fn build(&self, key: &ApiKey) -> Arc<dyn CompletionClient> {
        self.built_with.lock().push(key.as_str().to_string());
        Arc::new(self.client.clone())
    }
}

/// Handle hierarchy over a fresh in-memory store
pub fn memory_handles() -> (MemoryStore, Arc<StoreHandles>) {
    let store = MemoryStore::new();
    let handles = StoreHandles::new(
        Arc::new(store.clone()),
        StoreConfig {
            ready_timeout: std::time::Duration::from_millis(50),
            ..StoreConfig::default()
        },
    );
    (store, Arc::new(handles))
}
