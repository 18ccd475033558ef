//! In-memory conversation store
//!
//! Owns every conversation, the current selection and the exchange state of
//! each conversation. Mutations go through the exchange state machine; the
//! store applies message appends itself and hands the remaining effects back
//! to its caller as [`Change`]s, in the order they happened.

mod types;

pub use types::*;

use crate::responder::ResponseRequest;
use crate::state_machine::{transition, Effect, Event, ExchangeState, TransitionError};
use crate::title::{derive_title, PLACEHOLDER_TITLE};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    UnknownConversation(ConversationId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Observable change produced while applying an event
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    MessageAppended {
        conversation_id: ConversationId,
        message: Message,
    },
    TypingChanged {
        conversation_id: ConversationId,
        typing: bool,
    },
    ResponseRequested {
        reply_to: MessageId,
        request: ResponseRequest,
    },
    ResponseAborted {
        conversation_id: ConversationId,
        reply_to: MessageId,
    },
}

/// Result of [`ConversationStore::send_message`]
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Empty or whitespace-only input; nothing changed
    InputRejected,
    Accepted(SendReceipt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    /// A conversation was opened for this message
    pub created: bool,
    pub changes: Vec<Change>,
}

/// Conversation list plus current selection
#[derive(Debug, Default)]
pub struct ConversationStore {
    /// Most recent first
    conversations: Vec<Conversation>,
    exchanges: HashMap<ConversationId, ExchangeState>,
    current: Option<ConversationId>,
    ids: IdSequence,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Conversation Operations ====================

    /// Open an empty conversation, put it first and select it
    pub fn create_conversation(&mut self) -> &Conversation {
        self.open(PLACEHOLDER_TITLE.to_string())
    }

    /// Select an existing conversation
    pub fn select_conversation(&mut self, id: ConversationId) -> StoreResult<&Conversation> {
        let Some(index) = self.index_of(id) else {
            tracing::warn!(conv_id = %id, "Ignoring selection of unknown conversation");
            return Err(StoreError::UnknownConversation(id));
        };
        self.current = Some(id);
        Ok(&self.conversations[index])
    }

    /// Conversations, most recent first
    pub fn list_conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.index_of(id).map(|i| &self.conversations[i])
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current.and_then(|id| self.conversation(id))
    }

    pub fn current_id(&self) -> Option<ConversationId> {
        self.current
    }

    /// Whether the current conversation is waiting for a reply
    pub fn is_typing(&self) -> bool {
        self.current.is_some_and(|id| self.is_awaiting(id))
    }

    pub fn is_awaiting(&self, id: ConversationId) -> bool {
        self.exchanges.get(&id).is_some_and(ExchangeState::is_awaiting)
    }

    pub fn exchange(&self, id: ConversationId) -> Option<&ExchangeState> {
        self.exchanges.get(&id)
    }

    // ==================== Message Operations ====================

    /// Append a user message to the current conversation, opening one titled
    /// after `text` when nothing is selected.
    pub fn send_message(&mut self, text: &str) -> StoreResult<SendOutcome> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::InputRejected);
        }

        let (conversation_id, created) = match self.current {
            Some(id) => (id, false),
            None => (self.open(derive_title(text)).id, true),
        };

        let message_id = self.ids.next_message();
        let changes = self.dispatch(
            conversation_id,
            Event::UserMessage {
                message_id,
                text: text.to_string(),
            },
        )?;

        Ok(SendOutcome::Accepted(SendReceipt {
            conversation_id,
            message_id,
            created,
            changes,
        }))
    }

    /// Feed a responder or cancel event into a conversation's exchange
    pub fn dispatch(&mut self, id: ConversationId, event: Event) -> StoreResult<Vec<Change>> {
        let index = self
            .index_of(id)
            .ok_or(StoreError::UnknownConversation(id))?;

        let state = self.exchanges.get(&id).cloned().unwrap_or_default();
        let result = transition(&state, event)?;
        self.exchanges.insert(id, result.new_state);

        Ok(result
            .effects
            .into_iter()
            .map(|effect| self.apply(index, effect))
            .collect())
    }

    fn apply(&mut self, index: usize, effect: Effect) -> Change {
        let ids = &mut self.ids;
        let conversation = &mut self.conversations[index];
        let conversation_id = conversation.id;

        match effect {
            Effect::AppendUserMessage { message_id, text } => {
                let message = Message::user(message_id, text);
                conversation.messages.push(message.clone());
                Change::MessageAppended {
                    conversation_id,
                    message,
                }
            }
            Effect::AppendReply {
                reply_to,
                content,
                is_error,
            } => {
                let message = Message::assistant(ids.next_message(), reply_to, content, is_error);
                conversation.messages.push(message.clone());
                Change::MessageAppended {
                    conversation_id,
                    message,
                }
            }
            Effect::NotifyTyping { typing } => Change::TypingChanged {
                conversation_id,
                typing,
            },
            Effect::RequestResponse { reply_to } => {
                let text = conversation
                    .message(reply_to)
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                let request = ResponseRequest::new(
                    conversation_id,
                    &conversation.history_for(reply_to),
                    text,
                );
                Change::ResponseRequested { reply_to, request }
            }
            Effect::AbortResponse { reply_to } => Change::ResponseAborted {
                conversation_id,
                reply_to,
            },
        }
    }

    fn open(&mut self, title: String) -> &Conversation {
        let id = self.ids.next_conversation();
        tracing::debug!(conv_id = %id, title = %title, "Opening conversation");
        self.conversations.insert(0, Conversation::new(id, title));
        self.exchanges.insert(id, ExchangeState::Idle);
        self.current = Some(id);
        &self.conversations[0]
    }

    fn index_of(&self, id: ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }
}
