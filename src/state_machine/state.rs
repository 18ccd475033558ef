//! Exchange state types

use crate::store::MessageId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Per-conversation exchange state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeState {
    /// No user message is waiting for a reply
    #[default]
    Idle,

    /// A reply is being produced for `in_flight`
    AwaitingResponse {
        /// User message whose reply is currently requested
        in_flight: MessageId,
        /// User messages sent while busy, answered in order
        #[serde(default)]
        queued: VecDeque<MessageId>,
    },
}

impl ExchangeState {
    /// Check if a reply is pending (the typing indicator is shown)
    pub fn is_awaiting(&self) -> bool {
        matches!(self, ExchangeState::AwaitingResponse { .. })
    }

    /// Number of user messages still waiting for a reply
    pub fn pending_count(&self) -> usize {
        match self {
            ExchangeState::Idle => 0,
            ExchangeState::AwaitingResponse { queued, .. } => queued.len() + 1,
        }
    }

    /// The user message whose reply is currently requested
    pub fn in_flight(&self) -> Option<MessageId> {
        match self {
            ExchangeState::Idle => None,
            ExchangeState::AwaitingResponse { in_flight, .. } => Some(*in_flight),
        }
    }
}
