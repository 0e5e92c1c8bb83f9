use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prompts::chat_directive;

pub const CHAT_ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// A whole conversation: the standing directive plus every turn so far.
///
/// Sessions are values. Advancing one consumes it and yields the successor,
/// so two turns can never be in flight against the same transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub region: String,
    pub system_directive: String,
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            system_directive: chat_directive(&region),
            region,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_reply(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::Model)
    }

    /// Appends a completed exchange.
    pub fn with_turn(mut self, user_text: impl Into<String>, reply: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::new(ChatRole::User, user_text));
        self.messages.push(ChatMessage::new(ChatRole::Model, reply));
        self
    }

    /// Appends the user's message followed by the stock apology, keeping roles
    /// alternating after a failed turn.
    pub fn record_failed_turn(self, user_text: impl Into<String>) -> Self {
        self.with_turn(user_text, CHAT_ERROR_REPLY)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
