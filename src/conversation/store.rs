use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::db::KvBackend;
use crate::error::{ConversationError, KvError, Result};

use super::{ConversationKey, ConversationSession};

pub type Conversations = HashMap<ConversationKey, ConversationSession>;

/// Reads and writes whole per-namespace conversation maps.
///
/// Each namespace lives in one KV record (`conversation_<namespace>`) holding
/// a JSON object from canonical key strings to sessions. `save` overwrites the
/// record; there is no per-key merge, so the last writer wins.
#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn KvBackend>,
    timeout: Duration,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn KvBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn record_key(namespace: &str) -> String {
        format!("conversation_{namespace}")
    }

    /// Any undecodable key or session fails the whole load.
    pub async fn load(&self, namespace: &str) -> Result<Conversations> {
        let record = Self::record_key(namespace);
        let raw = tokio::time::timeout(self.timeout, self.backend.get(&record))
            .await
            .map_err(|_| KvError::Timeout(self.timeout.as_secs()))??;

        let Some(raw) = raw else {
            return Ok(Conversations::new());
        };

        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)
            .map_err(|e| {
                ConversationError::StoreCorruption(format!("record '{record}' is not a JSON object: {e}"))
            })?;

        let mut conversations = Conversations::with_capacity(entries.len());
        for (raw_key, value) in entries {
            let key = ConversationKey::decode(&raw_key)?;
            let session: ConversationSession = serde_json::from_value(value).map_err(|e| {
                ConversationError::StoreCorruption(format!("session {raw_key} in '{record}': {e}"))
            })?;
            if !session.is_well_formed() {
                return Err(ConversationError::StoreCorruption(format!(
                    "session {raw_key} in '{record}' does not start with a system turn"
                )));
            }
            conversations.insert(key, session);
        }

        tracing::debug!(namespace, count = conversations.len(), "conversations loaded");
        Ok(conversations)
    }

    pub async fn save(&self, namespace: &str, conversations: &Conversations) -> Result<()> {
        let record = Self::record_key(namespace);

        // BTreeMap keeps the written record stable across saves.
        let encoded: BTreeMap<String, &ConversationSession> = conversations
            .iter()
            .map(|(key, session)| (key.encode(), session))
            .collect();
        let raw = serde_json::to_string(&encoded).map_err(|e| {
            ConversationError::StoreCorruption(format!("could not serialise '{record}': {e}"))
        })?;

        tokio::time::timeout(self.timeout, self.backend.set(&record, &raw))
            .await
            .map_err(|_| KvError::Timeout(self.timeout.as_secs()))??;

        tracing::debug!(namespace, count = conversations.len(), "conversations saved");
        Ok(())
    }
}
