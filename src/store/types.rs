//! Conversation and message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a conversation, drawn from the store's id counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub u64);

/// Identifier of a message, drawn from the store's id counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source shared by conversations and messages.
///
/// Ids never come from the wall clock, so two entities created within the
/// same instant still get distinct, ordered ids.
#[derive(Debug, Default)]
pub struct IdSequence {
    last: u64,
}

impl IdSequence {
    pub fn next_conversation(&mut self) -> ConversationId {
        ConversationId(self.bump())
    }

    pub fn next_message(&mut self) -> MessageId {
        MessageId(self.bump())
    }

    fn bump(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// A single chat message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// User message this assistant message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    /// Assistant slot holds a failure notice instead of a reply
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            reply_to: None,
            is_error: false,
        }
    }

    pub fn assistant(
        id: MessageId,
        reply_to: MessageId,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
            reply_to: Some(reply_to),
            is_error,
        }
    }
}

/// An append-only thread of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Dialogue the service sees when answering `reply_to`: user messages
    /// sent before it and the replies to those. Messages queued behind
    /// `reply_to` are left out; replies to earlier messages are kept even
    /// when they landed after `reply_to` in the list.
    pub fn history_for(&self, reply_to: MessageId) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| match m.sender {
                Sender::User => m.id < reply_to,
                Sender::Assistant => m.reply_to.is_some_and(|answered| answered < reply_to),
            })
            .cloned()
            .collect()
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }
}
