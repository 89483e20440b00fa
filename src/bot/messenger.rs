use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;

/// Outbound side of the chat. Delivery failures are reported but the
/// conversation core never depends on them succeeding.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a new message and return its id.
    async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<i32>;

    async fn edit_message(&self, chat_id: i64, message_id: i32, text: &str) -> anyhow::Result<()>;
}

/// A sent placeholder that is later replaced with the final reply.
#[derive(Debug, Clone, Copy)]
pub struct Placeholder {
    pub chat_id: i64,
    pub message_id: Option<i32>,
}

impl Placeholder {
    pub async fn send(messenger: &dyn Messenger, chat_id: i64, text: &str) -> Self {
        let message_id = match messenger.send_message(chat_id, text).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "failed to send placeholder");
                None
            }
        };
        Self {
            chat_id,
            message_id,
        }
    }

    /// Replace the placeholder text, or send a fresh message if the
    /// placeholder never made it out.
    pub async fn finish(self, messenger: &dyn Messenger, text: &str) {
        let result = match self.message_id {
            Some(id) => messenger.edit_message(self.chat_id, id, text).await,
            None => messenger.send_message(self.chat_id, text).await.map(|_| ()),
        };
        if let Err(e) = result {
            tracing::warn!(chat_id = self.chat_id, error = %e, "failed to deliver reply");
        }
    }
}

/// Fire-and-forget send used for acknowledgements and error notices.
pub async fn notify(messenger: &dyn Messenger, chat_id: i64, text: &str) {
    if let Err(e) = messenger.send_message(chat_id, text).await {
        tracing::warn!(chat_id, error = %e, "failed to send message");
    }
}

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<i32> {
        let sent = self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(sent.id.0)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i32, text: &str) -> anyhow::Result<()> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .await?;
        Ok(())
    }
}
