use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message. Serialises to the `{"role", "content"}` shape the
/// chat-completion API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Ended,
}

/// One open `/ask` exchange.
///
/// `history[0]` is always the system turn; no operation removes or reorders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    history: Vec<Turn>,
    state: SessionState,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn start(system_prompt: &str) -> Self {
        Self::start_at(system_prompt, Utc::now())
    }

    pub fn start_at(system_prompt: &str, now: DateTime<Utc>) -> Self {
        Self {
            history: vec![Turn::system(system_prompt)],
            state: SessionState::Active,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn append_user(&mut self, text: &str) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive);
        }
        if text.trim().is_empty() {
            return Err(SessionError::EmptyText);
        }
        self.history.push(Turn::user(text));
        self.touch();
        Ok(())
    }

    pub fn append_assistant(&mut self, text: &str) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive);
        }
        self.history.push(Turn::assistant(text));
        self.touch();
        Ok(())
    }

    /// Undo the most recent `append_user`. Only valid while the last turn is a
    /// user turn, so the system turn can never be removed.
    pub fn rollback_last_user(&mut self) -> Result<Turn, SessionError> {
        match self.history.last() {
            Some(turn) if turn.role == Role::User => {}
            _ => return Err(SessionError::NothingToRollback),
        }
        let turn = self.history.pop().ok_or(SessionError::NothingToRollback)?;
        self.touch();
        Ok(turn)
    }

    pub fn end(&mut self) {
        self.state = SessionState::Ended;
    }

    /// True once `timeout` has passed since the last turn.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.updated_at >= timeout
    }

    /// Structural check applied to sessions read back from the store.
    pub fn is_well_formed(&self) -> bool {
        matches!(self.history.first(), Some(turn) if turn.role == Role::System)
            && self.history[1..].iter().all(|t| t.role != Role::System)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}
