//! Conversation turns and the per-session history.
//!
//! The history is append-only. Request windowing happens on a view of it
//! (see [HistoryWindow]); stored turns are never edited or removed.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// How much of the history is sent with each generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    /// Send every turn. Request size grows with the session.
    Unbounded,
    /// Send only the most recent `n` turns.
    LastTurns(usize),
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::LastTurns(Self::DEFAULT_TURNS)
    }
}

impl HistoryWindow {
    pub const DEFAULT_TURNS: usize = 20;

    /// From a config value where 0 means unbounded.
    pub fn from_limit(limit: usize) -> Self {
        if limit == 0 {
            Self::Unbounded
        } else {
            Self::LastTurns(limit)
        }
    }

    fn limit(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::LastTurns(n) => Some(n),
        }
    }
}

/// Ordered, append-only log of the turns in one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// A history that opens with an assistant greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.push(Turn::assistant(greeting));
        history
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The tail of the history allowed by `window`. A cut tail starts at its first
    /// user turn, so the model never sees a reply without the message it answered.
    pub fn window(&self, window: HistoryWindow) -> &[Turn] {
        match window.limit() {
            Some(n) if n < self.turns.len() => {
                let tail = &self.turns[self.turns.len() - n..];
                let start = tail.iter().position(|t| t.role == Role::User).unwrap_or(tail.len());
                &tail[start..]
            }
            _ => &self.turns,
        }
    }

    /// Content of the most recent turn not written by the user, i.e. the last
    /// question the assistant put to them.
    pub fn last_prompt_to_user(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role != Role::User)
            .map(|t| t.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
