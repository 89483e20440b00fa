use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, concise assistant chatting with a user on Telegram. \
     Answer in the language the user writes in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMode {
    /// One update per HTTP POST (serverless deployments).
    Webhook,
    /// teloxide long polling; enables the expiry sweeper.
    Polling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvBackendKind {
    Upstash { url: String, token: String },
    Postgres { database_url: String },
    Memory,
}

/// What to do when free text arrives for a key with no (or an expired) session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSessionPolicy {
    Reject,
    Reinitialize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_token: String,
    /// Used to accept `/ask@<username>` in group chats.
    pub bot_username: String,

    pub ai_token: String,
    pub ai_api_url: String,
    pub ai_model_id: String,
    pub system_prompt: String,

    pub mode: BotMode,
    pub bind_addr: String,
    pub webhook_secret: Option<String>,

    pub kv_backend: KvBackendKind,

    /// Inactivity window after which a session is dropped.
    pub conversation_timeout: chrono::Duration,
    pub request_timeout: Duration,
    pub missing_session_policy: MissingSessionPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).with_context(|| format!("{key} is not configured"));

        let mode = match var("BOT_MODE").as_deref().unwrap_or("webhook") {
            "webhook" => BotMode::Webhook,
            "polling" => BotMode::Polling,
            other => anyhow::bail!("BOT_MODE must be 'webhook' or 'polling', got '{other}'"),
        };

        let kv_backend = match var("KV_BACKEND").as_deref().unwrap_or("upstash") {
            "upstash" => KvBackendKind::Upstash {
                url: required("KV_REST_API_URL")?,
                token: required("KV_REST_API_TOKEN")?,
            },
            "postgres" => KvBackendKind::Postgres {
                database_url: required("DATABASE_URL")?,
            },
            "memory" => KvBackendKind::Memory,
            other => anyhow::bail!(
                "KV_BACKEND must be 'upstash', 'postgres' or 'memory', got '{other}'"
            ),
        };

        let missing_session_policy =
            match var("MISSING_SESSION_POLICY").as_deref().unwrap_or("reject") {
                "reject" => MissingSessionPolicy::Reject,
                "reinitialize" => MissingSessionPolicy::Reinitialize,
                other => anyhow::bail!(
                    "MISSING_SESSION_POLICY must be 'reject' or 'reinitialize', got '{other}'"
                ),
            };

        let secs = |key: &str, default: u64| -> anyhow::Result<Duration> {
            match var(key) {
                Some(raw) => {
                    let n: u64 = raw
                        .trim()
                        .parse()
                        .with_context(|| format!("{key} must be a whole number of seconds"))?;
                    Ok(Duration::from_secs(n))
                }
                None => Ok(Duration::from_secs(default)),
            }
        };

        let conversation_timeout = secs("CONVERSATION_TIMEOUT_SECS", 600)?;

        Ok(Self {
            telegram_token: required("TELEGRAM_TOKEN")?,
            bot_username: var("TELEGRAM_BOT_USERNAME").unwrap_or_default(),
            ai_token: required("AI_TOKEN")?,
            ai_api_url: var("AI_API_URL")
                .unwrap_or_else(|| "https://api.groq.com/openai/v1/chat/completions".to_string()),
            ai_model_id: var("AI_MODEL_ID").unwrap_or_else(|| "llama3-8b-8192".to_string()),
            system_prompt: var("SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            mode,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            webhook_secret: var("WEBHOOK_SECRET"),
            kv_backend,
            conversation_timeout: chrono::Duration::from_std(conversation_timeout)
                .context("CONVERSATION_TIMEOUT_SECS is too large")?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", 30)?,
            missing_session_policy,
        })
    }
}
