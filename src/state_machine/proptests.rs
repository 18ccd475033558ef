//! Property-based tests for the exchange state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::transition::*;
use super::*;
use crate::responder::ResponderError;
use crate::store::MessageId;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Action {
    Send(String),
    Reply(String),
    Fail,
    Cancel,
    /// Reply addressed to a message that is not in flight
    Stray,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => "[a-zA-Z ]{1,20}".prop_map(Action::Send),
        3 => "[a-z ]{0,20}".prop_map(Action::Reply),
        1 => Just(Action::Fail),
        1 => Just(Action::Cancel),
        1 => Just(Action::Stray),
    ]
}

fn arb_error() -> impl Strategy<Value = ResponderError> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(ResponderError::timeout),
        "[a-z ]{1,20}".prop_map(ResponderError::network),
        "[a-z ]{1,20}".prop_map(ResponderError::invalid_response),
    ]
}

fn arb_state() -> impl Strategy<Value = ExchangeState> {
    prop_oneof![
        Just(ExchangeState::Idle),
        (1u64..100, proptest::collection::vec(100u64..200, 0..4)).prop_map(
            |(in_flight, queued)| ExchangeState::AwaitingResponse {
                in_flight: MessageId(in_flight),
                queued: queued.into_iter().map(MessageId).collect(),
            }
        ),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (1u64..300, "[a-z]{1,10}").prop_map(|(id, text)| Event::UserMessage {
            message_id: MessageId(id),
            text,
        }),
        (1u64..300, "[a-z]{0,10}").prop_map(|(id, text)| Event::ResponseReady {
            reply_to: MessageId(id),
            text,
        }),
        (1u64..300, arb_error()).prop_map(|(id, error)| Event::ResponseFailed {
            reply_to: MessageId(id),
            error,
        }),
        Just(Event::Cancel),
    ]
}

// ============================================================================
// Simulation
// ============================================================================

/// Drives the machine the way the store does and records appended messages
#[derive(Default)]
struct Simulation {
    state: ExchangeState,
    next_id: u64,
    users: Vec<MessageId>,
    replies: Vec<MessageId>,
    requests: Vec<MessageId>,
    typing: bool,
}

impl Simulation {
    fn apply(&mut self, action: Action) {
        let event = match action {
            Action::Send(text) => {
                self.next_id += 1;
                Event::UserMessage {
                    message_id: MessageId(self.next_id),
                    text,
                }
            }
            Action::Reply(text) => match self.state.in_flight() {
                Some(reply_to) => Event::ResponseReady { reply_to, text },
                None => return,
            },
            Action::Fail => match self.state.in_flight() {
                Some(reply_to) => Event::ResponseFailed {
                    reply_to,
                    error: ResponderError::network("down"),
                },
                None => return,
            },
            Action::Cancel => Event::Cancel,
            Action::Stray => Event::ResponseReady {
                reply_to: MessageId(u64::MAX),
                text: "stray".to_string(),
            },
        };

        let Ok(result) = transition(&self.state, event) else {
            return;
        };
        self.state = result.new_state;

        for effect in result.effects {
            match effect {
                Effect::AppendUserMessage { message_id, .. } => self.users.push(message_id),
                Effect::AppendReply { reply_to, .. } => self.replies.push(reply_to),
                Effect::RequestResponse { reply_to } => self.requests.push(reply_to),
                Effect::NotifyTyping { typing } => {
                    assert_ne!(self.typing, typing, "typing indicator toggled twice");
                    self.typing = typing;
                }
                Effect::AbortResponse { .. } => {}
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Transition is pure: same inputs, same outputs
    #[test]
    fn prop_transition_is_deterministic(state in arb_state(), event in arb_event()) {
        let first = transition(&state, event.clone());
        let second = transition(&state, event);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.new_state, b.new_state);
                prop_assert_eq!(a.effects, b.effects);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "transition outcome differed between calls"),
        }
    }

    /// Replies are appended in user-message order, at most one per message,
    /// and the pending count always balances the difference.
    #[test]
    fn prop_one_reply_per_user_message(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut sim = Simulation::default();
        for action in actions {
            sim.apply(action);

            prop_assert!(sim.replies.len() <= sim.users.len());
            prop_assert_eq!(&sim.replies[..], &sim.users[..sim.replies.len()]);
            prop_assert_eq!(sim.state.pending_count(), sim.users.len() - sim.replies.len());
            prop_assert_eq!(sim.typing, sim.state.is_awaiting());
        }
    }

    /// Once everything resolves, each user message has exactly one reply
    #[test]
    fn prop_draining_resolves_everything(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut sim = Simulation::default();
        for action in actions {
            sim.apply(action);
        }
        while sim.state.is_awaiting() {
            sim.apply(Action::Reply("done".to_string()));
        }

        prop_assert_eq!(&sim.replies, &sim.users);
        prop_assert!(!sim.typing);
    }

    /// Responses are only ever requested for the message in flight, in send order
    #[test]
    fn prop_requests_follow_send_order(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut sim = Simulation::default();
        for action in actions {
            sim.apply(action);
        }

        let mut requested = sim.requests.clone();
        requested.dedup();
        prop_assert_eq!(&requested, &sim.requests, "a message was requested twice in a row");
        prop_assert!(sim.requests.windows(2).all(|w| w[0] < w[1]));
        if let Some(in_flight) = sim.state.in_flight() {
            prop_assert_eq!(sim.requests.last().copied(), Some(in_flight));
        }
    }

    /// Stray replies never change the state
    #[test]
    fn prop_stray_reply_is_rejected(state in arb_state()) {
        let result = transition(&state, Event::ResponseReady {
            reply_to: MessageId(u64::MAX),
            text: String::new(),
        });
        prop_assert_eq!(result.unwrap_err(), TransitionError::StaleResponse(MessageId(u64::MAX)));
    }
}
