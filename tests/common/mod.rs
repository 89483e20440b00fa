//! Shared mocks for integration tests: a scripted completion backend, a
//! messenger that records what the user would see, and KV backends that fail
//! on demand. Nothing here talks to Telegram or a real AI API.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;

use askbot::ai::ChatCompletion;
use askbot::bot::{AppState, Messenger};
use askbot::config::AppConfig;
use askbot::conversation::Turn;
use askbot::db::{KvBackend, MemoryKv};
use askbot::error::{CompletionError, KvError};

pub const SYSTEM_PROMPT: &str = "You are a test assistant.";

/// Replies in order from a script; an exhausted script fails the call.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedCompletion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: &Arc<Self>, text: &str) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self.clone()
    }

    pub fn fail(self: &Arc<Self>) -> Arc<Self> {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err("backend exploded".to_string()));
        self.clone()
    }

    /// Every history the backend was called with, in call order.
    pub fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedCompletion {
    async fn complete_chat(&self, history: &[Turn]) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(history.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(msg)) => Err(CompletionError::Request(msg)),
            None => Err(CompletionError::EmptyReply),
        }
    }
}

/// Holds every caller at a barrier before answering, so concurrent
/// invocations are guaranteed to have loaded the store before any saves.
pub struct BarrierCompletion {
    barrier: Barrier,
}

impl BarrierCompletion {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            barrier: Barrier::new(parties),
        })
    }
}

#[async_trait]
impl ChatCompletion for BarrierCompletion {
    async fn complete_chat(&self, history: &[Turn]) -> Result<String, CompletionError> {
        self.barrier.wait().await;
        let last = history.last().map(|t| t.content.clone()).unwrap_or_default();
        Ok(format!("echo: {last}"))
    }
}

/// Never answers; only a timeout ends the call.
pub struct StalledCompletion;

#[async_trait]
impl ChatCompletion for StalledCompletion {
    async fn complete_chat(&self, _history: &[Turn]) -> Result<String, CompletionError> {
        std::future::pending().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Sent { chat_id: i64, message_id: i32, text: String },
    Edited { chat_id: i64, message_id: i32, text: String },
}

impl Outgoing {
    pub fn text(&self) -> &str {
        match self {
            Outgoing::Sent { text, .. } | Outgoing::Edited { text, .. } => text,
        }
    }
}

/// Records sends and edits; message ids count up from 1.
#[derive(Default)]
pub struct RecordingMessenger {
    outgoing: Mutex<Vec<Outgoing>>,
}

impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn outgoing(&self) -> Vec<Outgoing> {
        self.outgoing.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.outgoing().iter().map(|o| o.text().to_string()).collect()
    }

    /// What the user currently sees as the bot's latest word.
    pub fn last_text(&self) -> Option<String> {
        self.outgoing().last().map(|o| o.text().to_string())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<i32> {
        let mut outgoing = self.outgoing.lock().unwrap();
        let message_id = outgoing.len() as i32 + 1;
        outgoing.push(Outgoing::Sent {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(message_id)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i32, text: &str) -> anyhow::Result<()> {
        self.outgoing.lock().unwrap().push(Outgoing::Edited {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Reads from an inner store but refuses every write.
pub struct ReadOnlyKv {
    pub inner: Arc<MemoryKv>,
}

#[async_trait]
impl KvBackend for ReadOnlyKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), KvError> {
        Err(KvError::Backend("write refused".to_string()))
    }
}

/// A backend that is never reachable.
pub struct DownKv;

#[async_trait]
impl KvBackend for DownKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Err(KvError::Request("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), KvError> {
        Err(KvError::Request("connection refused".to_string()))
    }
}

pub fn test_config(extra: &[(&str, &str)]) -> AppConfig {
    let mut pairs = vec![
        ("TELEGRAM_TOKEN", "123:test"),
        ("TELEGRAM_BOT_USERNAME", "askbot"),
        ("AI_TOKEN", "sk-test"),
        ("KV_BACKEND", "memory"),
        ("SYSTEM_PROMPT", SYSTEM_PROMPT),
        ("REQUEST_TIMEOUT_SECS", "5"),
    ];
    pairs.extend_from_slice(extra);
    AppConfig::from_lookup(|key: &str| {
        pairs
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .expect("test config must parse")
}

pub fn test_state(
    config: AppConfig,
    kv: Arc<dyn KvBackend>,
    completion: Arc<dyn ChatCompletion>,
    messenger: Arc<RecordingMessenger>,
) -> AppState {
    AppState {
        config,
        kv,
        completion,
        messenger,
    }
}
