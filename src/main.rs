use std::sync::Arc;

use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

use askbot::ai::LlmClient;
use askbot::bot::{self, AppState, TelegramMessenger};
use askbot::config::{AppConfig, BotMode};
use askbot::{db, webhook};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🤖 Starting askbot...");

    // Load config
    let config = AppConfig::from_env()?;
    tracing::info!(
        model = %config.ai_model_id,
        mode = ?config.mode,
        timeout_secs = config.conversation_timeout.num_seconds(),
        "config loaded"
    );

    let kv = db::connect(&config.kv_backend).await?;
    let bot = Bot::new(&config.telegram_token);

    let state = Arc::new(AppState {
        completion: Arc::new(LlmClient::new(&config)),
        messenger: Arc::new(TelegramMessenger::new(bot.clone())),
        kv,
        config,
    });

    match state.config.mode {
        BotMode::Webhook => webhook::serve(state).await?,
        BotMode::Polling => bot::run_polling(bot, state).await,
    }

    Ok(())
}
