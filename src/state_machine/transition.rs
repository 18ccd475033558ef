//! Pure state transition function
//!
//! One user message is answered by exactly one assistant-slot message.
//! Messages sent while a reply is pending are queued and answered in order.

use super::{Effect, Event, ExchangeState};
use crate::store::MessageId;
use std::collections::VecDeque;
use thiserror::Error;

/// Notice appended in place of a reply when the user cancels
pub const CANCELLED_NOTICE: &str = "Response cancelled.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ExchangeState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ExchangeState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("No reply is pending for message {0}")]
    StaleResponse(MessageId),
    #[error("Nothing to cancel")]
    NothingPending,
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs and performs
/// no I/O.
pub fn transition(
    state: &ExchangeState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Idle + UserMessage -> AwaitingResponse
        (ExchangeState::Idle, Event::UserMessage { message_id, text }) => Ok(
            TransitionResult::new(ExchangeState::AwaitingResponse {
                in_flight: message_id,
                queued: VecDeque::new(),
            })
            .with_effect(Effect::AppendUserMessage { message_id, text })
            .with_effect(Effect::typing_started())
            .with_effect(Effect::RequestResponse {
                reply_to: message_id,
            }),
        ),

        // AwaitingResponse + UserMessage -> queue behind the in-flight reply
        (
            ExchangeState::AwaitingResponse { in_flight, queued },
            Event::UserMessage { message_id, text },
        ) => {
            let mut queued = queued.clone();
            queued.push_back(message_id);
            Ok(TransitionResult::new(ExchangeState::AwaitingResponse {
                in_flight: *in_flight,
                queued,
            })
            .with_effect(Effect::AppendUserMessage { message_id, text }))
        }

        // AwaitingResponse + ResponseReady for the in-flight message
        (
            ExchangeState::AwaitingResponse { in_flight, queued },
            Event::ResponseReady { reply_to, text },
        ) if reply_to == *in_flight => Ok(advance(queued, Effect::reply(reply_to, text))),

        // AwaitingResponse + ResponseFailed -> inline error in the assistant slot
        (
            ExchangeState::AwaitingResponse { in_flight, queued },
            Event::ResponseFailed { reply_to, error },
        ) if reply_to == *in_flight => {
            Ok(advance(queued, Effect::error_reply(reply_to, error.notice())))
        }

        // AwaitingResponse + Cancel -> Idle, every pending message gets a notice
        (ExchangeState::AwaitingResponse { in_flight, queued }, Event::Cancel) => {
            let notices = std::iter::once(*in_flight)
                .chain(queued.iter().copied())
                .map(|id| Effect::error_reply(id, CANCELLED_NOTICE));

            Ok(TransitionResult::new(ExchangeState::Idle)
                .with_effect(Effect::AbortResponse {
                    reply_to: *in_flight,
                })
                .with_effects(notices)
                .with_effect(Effect::typing_stopped()))
        }

        (ExchangeState::Idle, Event::Cancel) => Err(TransitionError::NothingPending),

        // Replies for messages that are not in flight (late, or after cancel)
        (_, Event::ResponseReady { reply_to, .. } | Event::ResponseFailed { reply_to, .. }) => {
            Err(TransitionError::StaleResponse(reply_to))
        }
    }
}

/// Append the resolved reply, then request the next queued message or go idle
fn advance(queued: &VecDeque<MessageId>, reply: Effect) -> TransitionResult {
    let mut queued = queued.clone();
    match queued.pop_front() {
        Some(next) => TransitionResult::new(ExchangeState::AwaitingResponse {
            in_flight: next,
            queued,
        })
        .with_effect(reply)
        .with_effect(Effect::RequestResponse { reply_to: next }),
        None => TransitionResult::new(ExchangeState::Idle)
            .with_effect(reply)
            .with_effect(Effect::typing_stopped()),
    }
}
