use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::ai::{complete_within, ChatCompletion};
use crate::bot::messenger::{notify, Messenger, Placeholder};
use crate::config::{AppConfig, MissingSessionPolicy};
use crate::error::{ConversationError, Result, COMPLETION_FAILED_REPLY};

use super::store::{ConversationStore, Conversations};
use super::{ConversationKey, ConversationSession};

pub const ASK_NAMESPACE: &str = "ask";
pub const THINKING_PLACEHOLDER: &str = "🤔 Thinking...";

#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub namespace: String,
    pub system_prompt: String,
    pub inactivity_timeout: Duration,
    pub request_timeout: std::time::Duration,
    pub missing_session: MissingSessionPolicy,
}

impl ConversationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            namespace: ASK_NAMESPACE.to_string(),
            system_prompt: config.system_prompt.clone(),
            inactivity_timeout: config.conversation_timeout,
            request_timeout: config.request_timeout,
            missing_session: config.missing_session_policy,
        }
    }
}

/// What a free-text message did to the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Replied(String),
    /// The AI call failed and the user turn was rolled back.
    RolledBack,
}

/// Drives `start → message* → end` for one update at a time.
///
/// Built per update; holds no state of its own beyond its collaborators, so
/// everything that must survive lives in the [`ConversationStore`].
pub struct ConversationController {
    store: ConversationStore,
    completion: Arc<dyn ChatCompletion>,
    messenger: Arc<dyn Messenger>,
    settings: ConversationSettings,
}

impl ConversationController {
    pub fn new(
        store: ConversationStore,
        completion: Arc<dyn ChatCompletion>,
        messenger: Arc<dyn Messenger>,
        settings: ConversationSettings,
    ) -> Self {
        Self {
            store,
            completion,
            messenger,
            settings,
        }
    }

    fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// Tell the user about `err` and hand it back for logging.
    async fn report(&self, key: &ConversationKey, err: ConversationError) -> ConversationError {
        notify(self.messenger.as_ref(), key.chat_id(), &err.user_message()).await;
        err
    }

    /// `/ask [prompt]`: begin a fresh session, replacing any existing one.
    /// A non-empty prompt is then handled like a follow-up message.
    pub async fn start(&self, key: &ConversationKey, prompt: &str) -> Result<Option<Exchange>> {
        if let Err(err) = self.open_session(key).await {
            return Err(self.report(key, err).await);
        }
        notify(
            self.messenger.as_ref(),
            key.chat_id(),
            "💬 New conversation started. Send me messages and I'll remember the context.\n\
             Use /end to finish.",
        )
        .await;

        if prompt.trim().is_empty() {
            return Ok(None);
        }
        self.continue_conversation(key, prompt).await.map(Some)
    }

    async fn open_session(&self, key: &ConversationKey) -> Result<()> {
        let mut conversations = self.store.load(self.namespace()).await?;
        let replaced = conversations
            .insert(key.clone(), ConversationSession::start(&self.settings.system_prompt))
            .is_some();
        self.store.save(self.namespace(), &conversations).await?;
        tracing::info!(key = %key, replaced, "conversation started");
        Ok(())
    }

    /// Free text for `key`: one user turn, one completion call, one save.
    pub async fn continue_conversation(&self, key: &ConversationKey, text: &str) -> Result<Exchange> {
        let mut conversations = match self.checkout(key, text).await {
            Ok(conversations) => conversations,
            Err(err) => return Err(self.report(key, err).await),
        };

        let placeholder =
            Placeholder::send(self.messenger.as_ref(), key.chat_id(), THINKING_PLACEHOLDER).await;

        match self.exchange(&mut conversations, key, text).await {
            Ok(exchange) => {
                let reply = match &exchange {
                    Exchange::Replied(reply) => reply.as_str(),
                    Exchange::RolledBack => COMPLETION_FAILED_REPLY,
                };
                placeholder.finish(self.messenger.as_ref(), reply).await;
                Ok(exchange)
            }
            Err(err) => {
                placeholder
                    .finish(self.messenger.as_ref(), &err.user_message())
                    .await;
                Err(err)
            }
        }
    }

    /// Load the namespace and make sure `key` has a usable session, applying
    /// lazy expiry and the missing-session policy.
    async fn checkout(&self, key: &ConversationKey, text: &str) -> Result<Conversations> {
        if text.trim().is_empty() {
            return Err(ConversationError::InvalidInput(
                "Please send a non-empty message.".to_string(),
            ));
        }

        let mut conversations = self.store.load(self.namespace()).await?;
        let expired = self.purge_if_expired(&mut conversations, key, Utc::now());

        if conversations.contains_key(key) {
            return Ok(conversations);
        }

        match self.settings.missing_session {
            MissingSessionPolicy::Reject => {
                if expired {
                    self.store.save(self.namespace(), &conversations).await?;
                }
                let hint = if expired {
                    "⌛ Your conversation timed out. Send /ask to start a new one."
                } else {
                    "There is no active conversation. Send /ask to start one."
                };
                Err(ConversationError::InvalidInput(hint.to_string()))
            }
            MissingSessionPolicy::Reinitialize => {
                tracing::info!(key = %key, expired, "no session found; starting a fresh one");
                conversations.insert(
                    key.clone(),
                    ConversationSession::start(&self.settings.system_prompt),
                );
                Ok(conversations)
            }
        }
    }

    /// Append, ask the backend, then persist: the store is written exactly
    /// once, after the completion call has settled.
    async fn exchange(
        &self,
        conversations: &mut Conversations,
        key: &ConversationKey,
        text: &str,
    ) -> Result<Exchange> {
        let session = conversations.get_mut(key).ok_or_else(|| {
            ConversationError::InvalidInput("There is no active conversation.".to_string())
        })?;
        session.append_user(text)?;

        let reply = complete_within(
            self.completion.as_ref(),
            session.history(),
            self.settings.request_timeout,
        )
        .await;
        let exchange = match reply {
            Ok(reply) => {
                session.append_assistant(&reply)?;
                Exchange::Replied(reply)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "completion failed; rolling back user turn");
                session.rollback_last_user()?;
                Exchange::RolledBack
            }
        };

        self.store.save(self.namespace(), conversations).await?;
        Ok(exchange)
    }

    /// `/end`: drop the session from the store.
    pub async fn end(&self, key: &ConversationKey) -> Result<()> {
        if let Err(err) = self.close_session(key).await {
            return Err(self.report(key, err).await);
        }
        notify(
            self.messenger.as_ref(),
            key.chat_id(),
            "👋 Conversation ended. Send /ask to start a new one.",
        )
        .await;
        Ok(())
    }

    async fn close_session(&self, key: &ConversationKey) -> Result<()> {
        let mut conversations = self.store.load(self.namespace()).await?;
        let Some(mut session) = conversations.remove(key) else {
            return Err(ConversationError::InvalidInput(
                "There is no active conversation to end.".to_string(),
            ));
        };
        session.end();
        self.store.save(self.namespace(), &conversations).await?;
        tracing::info!(key = %key, turns = session.history().len(), "conversation ended");
        Ok(())
    }

    /// Remove every session idle for longer than the inactivity window.
    /// Returns how many were removed; writes only when something changed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut conversations = self.store.load(self.namespace()).await?;
        let before = conversations.len();
        let timeout = self.settings.inactivity_timeout;
        conversations.retain(|_, session| !session.is_expired(now, timeout));
        let removed = before - conversations.len();

        if removed > 0 {
            self.store.save(self.namespace(), &conversations).await?;
            tracing::info!(namespace = self.namespace(), removed, "expired conversations removed");
        }
        Ok(removed)
    }

    fn purge_if_expired(
        &self,
        conversations: &mut Conversations,
        key: &ConversationKey,
        now: DateTime<Utc>,
    ) -> bool {
        let expired = conversations
            .get(key)
            .is_some_and(|s| s.is_expired(now, self.settings.inactivity_timeout));
        if expired {
            conversations.remove(key);
            tracing::info!(key = %key, "conversation timed out");
        }
        expired
    }
}
