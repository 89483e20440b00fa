use teloxide::prelude::*;

use crate::ai::complete_within;
use crate::bot::messenger::{notify, Placeholder};
use crate::bot::AppState;
use crate::conversation::{ConversationKey, Turn};
use crate::error::{ConversationError, COMPLETION_FAILED_REPLY};

pub const TRANSLATING_PLACEHOLDER: &str = "⏳ Translating...";

const TRANSLATOR_PROMPT: &str = "You are a professional translation engine fluent in many languages. \
     Translate the user's text between Chinese and English: 1. detect the source language; \
     2. translate Chinese into English and English into Chinese; \
     3. return only the translated plain text, without explanations, notes, the original text or pleasantries.";

/// Text pulled out of a Telegram message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat_id: i64,
    pub user_id: i64,
    pub first_name: Option<String>,
    pub text: String,
}

impl Inbound {
    /// `None` for anything without text (stickers, photos, service messages).
    pub fn from_message(msg: &Message) -> Option<Self> {
        let text = msg.text()?;
        Some(Self {
            chat_id: msg.chat.id.0,
            user_id: msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0),
            first_name: msg.from.as_ref().map(|u| u.first_name.clone()),
            text: text.to_string(),
        })
    }

    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(self.chat_id, self.user_id)
    }
}

/// `/t <text>`: one-shot translation, no session involved.
pub async fn translate(state: &AppState, chat_id: i64, text: &str) {
    let messenger = state.messenger.as_ref();

    if text.trim().is_empty() {
        notify(messenger, chat_id, "Please put the text to translate after /t.").await;
        return;
    }

    let placeholder = Placeholder::send(messenger, chat_id, TRANSLATING_PLACEHOLDER).await;
    let history = [Turn::system(TRANSLATOR_PROMPT), Turn::user(text.trim())];

    let translated =
        complete_within(state.completion.as_ref(), &history, state.config.request_timeout).await;
    match translated {
        Ok(translated) => placeholder.finish(messenger, &translated).await,
        Err(e) => {
            tracing::warn!(chat_id, error = %e, "translation failed");
            placeholder.finish(messenger, COMPLETION_FAILED_REPLY).await;
        }
    }
}

/// Free text outside any command.
pub async fn handle_text(state: &AppState, inbound: &Inbound) -> Result<(), ConversationError> {
    state
        .controller()
        .continue_conversation(&inbound.key(), &inbound.text)
        .await?;
    Ok(())
}
