use thiserror::Error;

pub const COMPLETION_FAILED_REPLY: &str =
    "❌ The AI service failed to answer. Please send your message again.";

/// Failures raised by a [`crate::db::KvBackend`].
#[derive(Error, Debug)]
pub enum KvError {
    #[error("KV request failed: {0}")]
    Request(String),

    #[error("KV backend returned an error: {0}")]
    Backend(String),

    #[error("KV operation timed out after {0}s")]
    Timeout(u64),
}

/// Failures raised by the chat-completion collaborator.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("completion response had no reply text")]
    EmptyReply,

    #[error("completion timed out after {0}s")]
    Timeout(u64),
}

/// Misuse of a [`crate::conversation::ConversationSession`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("session has ended")]
    NotActive,

    #[error("message text is empty")]
    EmptyText,

    #[error("last turn is not a user turn; nothing to roll back")]
    NothingToRollback,
}

#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("conversation store unavailable: {0}")]
    StoreUnavailable(#[from] KvError),

    #[error("conversation store is corrupted: {0}")]
    StoreCorruption(String),

    #[error("completion failed: {0}")]
    CompletionFailed(#[from] CompletionError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl ConversationError {
    /// Plain-text reply shown to the Telegram user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ConversationError::StoreUnavailable(_) => {
                "⚠️ Conversation storage is unavailable right now. Please try again later.".to_string()
            }
            ConversationError::StoreCorruption(_) => {
                "⚠️ Stored conversation data could not be read. Conversations are unavailable \
                 until the bot's storage is repaired."
                    .to_string()
            }
            ConversationError::CompletionFailed(_) => COMPLETION_FAILED_REPLY.to_string(),
            ConversationError::InvalidInput(hint) => hint.clone(),
            ConversationError::Session(_) => {
                "⚠️ Something went wrong with this conversation. Use /ask to start a new one."
                    .to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ConversationError>;
