pub mod commands;
pub mod handlers;
pub mod messenger;

use std::sync::Arc;
use std::time::Duration;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use teloxide::utils::command::BotCommands as _;

use crate::ai::ChatCompletion;
use crate::config::AppConfig;
use crate::conversation::{ConversationController, ConversationSettings, ConversationStore};
use crate::db::KvBackend;
use crate::error::ConversationError;

pub use commands::BotCommand;
pub use handlers::Inbound;
pub use messenger::{Messenger, TelegramMessenger};

/// Shared, read-only application state. Anything mutable lives in the KV
/// store; per-update components are built from this on demand.
pub struct AppState {
    pub config: AppConfig,
    pub kv: Arc<dyn KvBackend>,
    pub completion: Arc<dyn ChatCompletion>,
    pub messenger: Arc<dyn Messenger>,
}

impl AppState {
    /// A fresh controller for one update.
    pub fn controller(&self) -> ConversationController {
        ConversationController::new(
            ConversationStore::new(self.kv.clone(), self.config.request_timeout),
            self.completion.clone(),
            self.messenger.clone(),
            ConversationSettings::from_config(&self.config),
        )
    }
}

/// Handle one Telegram update. Only text messages are acted on.
pub async fn process_update(state: &AppState, update: Update) -> Result<(), ConversationError> {
    match update.kind {
        UpdateKind::Message(msg) => match Inbound::from_message(&msg) {
            Some(inbound) => route(state, inbound).await,
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

/// Dispatch text to a command handler or to the open conversation.
///
/// Failures are already reported to the user by the time they get here.
/// An unreachable store is passed up so the transport can ask for
/// redelivery. Everything else, including a corrupted record that no retry
/// can fix, ends with the reply the user has already seen.
pub async fn route(state: &AppState, inbound: Inbound) -> Result<(), ConversationError> {
    let result = match BotCommand::parse(&inbound.text, &state.config.bot_username) {
        Ok(cmd) => commands::handle_command(state, &inbound, cmd).await,
        Err(_) if inbound.text.starts_with('/') => {
            tracing::debug!(chat_id = inbound.chat_id, text = %inbound.text, "ignoring unknown command");
            Ok(())
        }
        Err(_) => handlers::handle_text(state, &inbound).await,
    };

    match result {
        Err(err @ ConversationError::StoreUnavailable(_)) => {
            tracing::error!(chat_id = inbound.chat_id, error = %err, "conversation store unavailable");
            Err(err)
        }
        Err(err @ ConversationError::StoreCorruption(_)) => {
            tracing::error!(chat_id = inbound.chat_id, error = %err, "conversation store needs repair");
            Ok(())
        }
        Err(err) => {
            tracing::info!(chat_id = inbound.chat_id, error = %err, "update rejected");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

/// Build the teloxide update handler tree for long-polling mode.
pub fn build_handler() -> UpdateHandler<anyhow::Error> {
    let message_handler = Update::filter_message().endpoint(on_message);

    dptree::entry().branch(message_handler)
}

async fn on_message(msg: Message, state: Arc<AppState>) -> anyhow::Result<()> {
    if let Some(inbound) = Inbound::from_message(&msg) {
        route(&state, inbound).await?;
    }
    Ok(())
}

/// Long-polling mode: the process stays up, so inactivity timeouts can be
/// enforced by a background sweep in addition to the lazy check on load.
pub async fn run_polling(bot: Bot, state: Arc<AppState>) {
    let sweeper = spawn_expiry_sweeper(state.clone(), Duration::from_secs(60));

    Dispatcher::builder(bot, build_handler())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    sweeper.abort();
}

pub fn spawn_expiry_sweeper(state: Arc<AppState>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = state.controller().sweep_expired(chrono::Utc::now()).await {
                tracing::warn!(error = %e, "expiry sweep failed");
            }
        }
    })
}
