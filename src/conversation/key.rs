use std::fmt;

use crate::error::ConversationError;

/// Ordered integer tuple naming one conversation, normally `(chat_id, user_id)`.
///
/// The store only understands string keys, so every key has exactly one
/// canonical string form: the compact JSON array of its parts (`[-100123,42]`).
/// [`ConversationKey::decode`] accepts only that form, which keeps the
/// string <-> tuple mapping a bijection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey(Vec<i64>);

impl ConversationKey {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self(vec![chat_id, user_id])
    }

    /// Arbitrary non-empty tuple. Returns `None` for an empty one.
    pub fn from_parts(parts: Vec<i64>) -> Option<Self> {
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts))
        }
    }

    pub fn parts(&self) -> &[i64] {
        &self.0
    }

    pub fn chat_id(&self) -> i64 {
        self.0[0]
    }

    pub fn encode(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(i64::to_string).collect();
        format!("[{}]", parts.join(","))
    }

    pub fn decode(raw: &str) -> Result<Self, ConversationError> {
        let malformed = || {
            ConversationError::StoreCorruption(format!("malformed conversation key {raw:?}"))
        };

        let parts: Vec<i64> = serde_json::from_str(raw).map_err(|_| malformed())?;
        let key = Self::from_parts(parts).ok_or_else(|| malformed())?;

        // "[1, 2]" parses to the same tuple as "[1,2]"; only the canonical
        // spelling may name a stored conversation.
        if key.encode() != raw {
            return Err(malformed());
        }
        Ok(key)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
