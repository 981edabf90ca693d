//! Conversation persistence over the store handle hierarchy

use std::collections::HashMap;
use std::sync::Arc;

use chatline_store::{DriverError, Error as StoreError, StoreHandles};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::conversation::{Conversation, ConversationDocument};
use crate::error::{Error, Result};

/// Loads and saves conversations, keeping a copy of each one it has seen.
///
/// A clean cached copy is served as is; an absent or dirty one is reloaded.
pub struct ConversationRepository {
    store: Arc<StoreHandles>,
    cache: Mutex<HashMap<String, Conversation>>,
}

impl ConversationRepository {
    pub fn new(store: Arc<StoreHandles>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch one conversation from the store. The result is always clean.
    pub async fn load_conversation(&self, id: &str) -> Result<Conversation> {
        let value = self.store.get_document(id).await?;
        let doc: ConversationDocument =
            serde_json::from_value(value).map_err(|source| Error::Decode {
                id: id.to_string(),
                source,
            })?;
        Ok(Conversation::from_document(doc))
    }

    /// Persist a conversation under its id.
    ///
    /// On success the conversation is marked clean and cached; on failure it
    /// is marked dirty.
    pub async fn save_conversation(&self, conversation: &mut Conversation) -> Result<()> {
        let value = match serde_json::to_value(conversation.to_document()) {
            Ok(value) => value,
            Err(e) => {
                conversation.mark_dirty();
                return Err(StoreError::PersistFailed(DriverError::Json(e)).into());
            }
        };
        if let Err(e) = self.store.upsert_document(conversation.id(), value).await {
            conversation.mark_dirty();
            return Err(e.into());
        }

        conversation.mark_clean();
        self.cache
            .lock()
            .insert(conversation.id().to_string(), conversation.clone());
        info!(id = conversation.id(), name = conversation.name(), "saved conversation");
        Ok(())
    }

    /// Load every stored conversation in id order, stopping at the first failure
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let ids = self.store.list_document_ids().await?;
        let mut conversations = Vec::with_capacity(ids.len());
        for id in &ids {
            let conversation = self.load_conversation(id).await?;
            self.cache.lock().insert(id.clone(), conversation.clone());
            conversations.push(conversation);
        }
        debug!(count = conversations.len(), "listed conversations");
        Ok(conversations)
    }

    /// Cached conversation, reloaded when missing or dirty
    pub async fn get_conversation(&self, id: &str) -> Result<Conversation> {
        let cached = self
            .cache
            .lock()
            .get(id)
            .filter(|c| !c.is_dirty())
            .cloned();
        if let Some(conversation) = cached {
            return Ok(conversation);
        }

        let conversation = self.load_conversation(id).await?;
        self.cache.lock().insert(id.to_string(), conversation.clone());
        Ok(conversation)
    }

    /// Remove every stored conversation, stopping at the first failure
    pub async fn delete_all(&self) -> Result<()> {
        let ids = self.store.list_document_ids().await?;
        for id in &ids {
            self.delete_conversation(id).await?;
        }
        info!(count = ids.len(), "deleted all conversations");
        Ok(())
    }

    /// Remove one stored conversation
    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        self.store.remove_document(id).await?;
        self.cache.lock().remove(id);
        debug!(id, "deleted conversation");
        Ok(())
    }
}
