//! Effects produced by state transitions

use crate::store::MessageId;

/// Effects to be executed after a state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append the user message carried by the event
    AppendUserMessage { message_id: MessageId, text: String },

    /// Append the assistant message answering `reply_to`
    AppendReply {
        reply_to: MessageId,
        content: String,
        is_error: bool,
    },

    /// Show or hide the typing indicator
    NotifyTyping { typing: bool },

    /// Ask the responder for a reply to `reply_to`
    RequestResponse { reply_to: MessageId },

    /// Abort the running responder call for `reply_to`
    AbortResponse { reply_to: MessageId },
}

impl Effect {
    pub fn reply(reply_to: MessageId, content: impl Into<String>) -> Self {
        Effect::AppendReply {
            reply_to,
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error_reply(reply_to: MessageId, content: impl Into<String>) -> Self {
        Effect::AppendReply {
            reply_to,
            content: content.into(),
            is_error: true,
        }
    }

    pub fn typing_started() -> Self {
        Effect::NotifyTyping { typing: true }
    }

    pub fn typing_stopped() -> Self {
        Effect::NotifyTyping { typing: false }
    }
}
