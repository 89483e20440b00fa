pub mod llm;

use std::time::Duration;

use async_trait::async_trait;

use crate::conversation::Turn;
use crate::error::CompletionError;

pub use llm::LlmClient;

/// The AI backend as seen by the bot: ordered history in, reply text out.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete_chat(&self, history: &[Turn]) -> Result<String, CompletionError>;
}

/// `complete_chat` bounded by `limit`; an elapsed call is a
/// [`CompletionError::Timeout`].
pub async fn complete_within(
    completion: &dyn ChatCompletion,
    history: &[Turn],
    limit: Duration,
) -> Result<String, CompletionError> {
    tokio::time::timeout(limit, completion.complete_chat(history))
        .await
        .map_err(|_| CompletionError::Timeout(limit.as_secs()))?
}
