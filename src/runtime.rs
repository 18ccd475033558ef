//! Runtime owning the conversation store
//!
//! A single task holds the [`ConversationStore`] and applies commands in the
//! order they arrive. Responder calls run as background tasks and report
//! back through a channel, so the store is never touched from two places.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::StoreRuntime;

use crate::store::{Conversation, ConversationId, Message, StoreError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Capacity of the command channel
const COMMAND_BUFFER: usize = 64;
/// Capacity of the observer broadcast
const EVENT_BUFFER: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Store runtime has shut down")]
    Closed,
}

/// Events broadcast to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    ConversationCreated {
        conversation_id: ConversationId,
        title: String,
    },
    CurrentChanged {
        conversation_id: ConversationId,
    },
    MessageAppended {
        conversation_id: ConversationId,
        message: Message,
    },
    TypingChanged {
        conversation_id: ConversationId,
        typing: bool,
    },
    Error {
        message: String,
    },
}

/// Store state read in one step of the runtime task
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    /// Most recent first
    pub conversations: Vec<Conversation>,
    pub current_id: Option<ConversationId>,
    pub is_typing: bool,
}

impl StoreSnapshot {
    pub fn current(&self) -> Option<&Conversation> {
        let id = self.current_id?;
        self.conversations.iter().find(|c| c.id == id)
    }
}

/// Result of a send as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendAck {
    pub accepted: bool,
    pub conversation_id: Option<ConversationId>,
    pub is_typing: bool,
}

impl SendAck {
    fn rejected(conversation_id: Option<ConversationId>, is_typing: bool) -> Self {
        Self {
            accepted: false,
            conversation_id,
            is_typing,
        }
    }
}

/// Commands sent from handles to the runtime task
#[derive(Debug)]
pub(crate) enum Command {
    CreateConversation {
        reply: oneshot::Sender<Conversation>,
    },
    SelectConversation {
        id: ConversationId,
        reply: oneshot::Sender<Result<Conversation, StoreError>>,
    },
    SendMessage {
        text: String,
        reply: oneshot::Sender<Result<SendAck, StoreError>>,
    },
    Cancel {
        id: ConversationId,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    ListConversations {
        reply: oneshot::Sender<Vec<Conversation>>,
    },
    Current {
        reply: oneshot::Sender<Option<Conversation>>,
    },
    Conversation {
        id: ConversationId,
        reply: oneshot::Sender<Option<Conversation>>,
    },
    IsTyping {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<StoreSnapshot>,
    },
    /// Subscribe and snapshot together, so the receiver holds exactly the
    /// events that follow the snapshot
    Subscribe {
        reply: oneshot::Sender<(broadcast::Receiver<StoreEvent>, StoreSnapshot)>,
    },
}

/// Cloneable handle to the store runtime
#[derive(Clone)]
pub struct StoreHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<StoreEvent>,
}

impl StoreHandle {
    /// Create a handle plus the command receiver for the runtime task
    pub(crate) fn channel() -> (Self, mpsc::Receiver<Command>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (broadcast_tx, _) = broadcast::channel(EVENT_BUFFER);
        (
            Self {
                command_tx,
                broadcast_tx,
            },
            command_rx,
        )
    }

    pub(crate) fn broadcast_tx(&self) -> broadcast::Sender<StoreEvent> {
        self.broadcast_tx.clone()
    }

    /// Observe store events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Current state plus a receiver for every event after it
    pub async fn subscribe_with_snapshot(
        &self,
    ) -> Result<(broadcast::Receiver<StoreEvent>, StoreSnapshot), RuntimeError> {
        self.request(|reply| Command::Subscribe { reply }).await
    }

    /// Conversations, selection and typing flag from the same store state
    pub async fn snapshot(&self) -> Result<StoreSnapshot, RuntimeError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn create_conversation(&self) -> Result<Conversation, RuntimeError> {
        self.request(|reply| Command::CreateConversation { reply })
            .await
    }

    pub async fn select_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, RuntimeError> {
        Ok(self
            .request(|reply| Command::SelectConversation { id, reply })
            .await??)
    }

    /// Append a user message; returns once the message is in the store
    pub async fn send_message(&self, text: impl Into<String>) -> Result<SendAck, RuntimeError> {
        let text = text.into();
        Ok(self
            .request(|reply| Command::SendMessage { text, reply })
            .await??)
    }

    /// Abort the pending exchange of a conversation
    pub async fn cancel(&self, id: ConversationId) -> Result<(), RuntimeError> {
        Ok(self.request(|reply| Command::Cancel { id, reply }).await??)
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, RuntimeError> {
        self.request(|reply| Command::ListConversations { reply })
            .await
    }

    pub async fn current(&self) -> Result<Option<Conversation>, RuntimeError> {
        self.request(|reply| Command::Current { reply }).await
    }

    pub async fn conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RuntimeError> {
        self.request(|reply| Command::Conversation { id, reply })
            .await
    }

    pub async fn is_typing(&self) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::IsTyping { reply }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        reply_rx.await.map_err(|_| RuntimeError::Closed)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("observers", &self.broadcast_tx.receiver_count())
            .finish_non_exhaustive()
    }
}
