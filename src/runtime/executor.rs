//! Store runtime executor

use super::{Command, SendAck, StoreEvent, StoreHandle, StoreSnapshot};

use crate::responder::{Responder, ResponderError, ResponseRequest};
use crate::state_machine::{Event, ExchangeState, TransitionError};
use crate::store::{Change, ConversationId, ConversationStore, MessageId, SendOutcome, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Reply outcome reported back by a responder task
#[derive(Debug)]
struct Completion {
    conversation_id: ConversationId,
    reply_to: MessageId,
    event: Event,
}

/// Single owner of the conversation store
pub struct StoreRuntime {
    store: ConversationStore,
    responder: Arc<dyn Responder>,
    response_timeout: Duration,
    command_rx: mpsc::Receiver<Command>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    broadcast_tx: broadcast::Sender<StoreEvent>,
    /// Token for the reply each conversation is currently waiting on
    in_flight: HashMap<ConversationId, (MessageId, CancellationToken)>,
}

impl StoreRuntime {
    pub fn new(responder: Arc<dyn Responder>, response_timeout: Duration) -> (Self, StoreHandle) {
        let (handle, command_rx) = StoreHandle::channel();
        let (completion_tx, completion_rx) = mpsc::channel(32);

        let runtime = Self {
            store: ConversationStore::new(),
            responder,
            response_timeout,
            command_rx,
            completion_tx,
            completion_rx,
            broadcast_tx: handle.broadcast_tx(),
            in_flight: HashMap::new(),
        };
        (runtime, handle)
    }

    /// Start the runtime on its own task
    pub fn spawn(responder: Arc<dyn Responder>, response_timeout: Duration) -> StoreHandle {
        let (runtime, handle) = Self::new(responder, response_timeout);
        tokio::spawn(runtime.run());
        handle
    }

    pub async fn run(mut self) {
        tracing::info!(
            responder = %self.responder.name(),
            timeout_ms = %self.response_timeout.as_millis(),
            "Starting store runtime"
        );

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    // Every handle dropped
                    None => break,
                },
                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }
            }
        }

        for (_, token) in self.in_flight.values() {
            token.cancel();
        }
        tracing::info!("Store runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::CreateConversation { reply } => {
                let conversation = self.store.create_conversation().clone();
                tracing::info!(conv_id = %conversation.id, "Created conversation");
                self.emit(StoreEvent::ConversationCreated {
                    conversation_id: conversation.id,
                    title: conversation.title.clone(),
                });
                self.emit(StoreEvent::CurrentChanged {
                    conversation_id: conversation.id,
                });
                let _ = reply.send(conversation);
            }

            Command::SelectConversation { id, reply } => {
                let result = self.store.select_conversation(id).cloned();
                match &result {
                    Ok(_) => self.emit(StoreEvent::CurrentChanged {
                        conversation_id: id,
                    }),
                    Err(e) => self.report(e),
                }
                let _ = reply.send(result);
            }

            Command::SendMessage { text, reply } => {
                let result = self.send_message(&text);
                if let Err(e) = &result {
                    self.report(e);
                }
                let _ = reply.send(result);
            }

            Command::Cancel { id, reply } => {
                let result = self.store.dispatch(id, Event::Cancel).map(|changes| {
                    tracing::info!(conv_id = %id, "Cancelled pending reply");
                    self.apply_changes(changes);
                });
                if let Err(e) = &result {
                    self.report(e);
                }
                let _ = reply.send(result);
            }

            Command::ListConversations { reply } => {
                let _ = reply.send(self.store.list_conversations().to_vec());
            }

            Command::Current { reply } => {
                let _ = reply.send(self.store.current().cloned());
            }

            Command::Conversation { id, reply } => {
                let _ = reply.send(self.store.conversation(id).cloned());
            }

            Command::IsTyping { reply } => {
                let _ = reply.send(self.store.is_typing());
            }

            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }

            Command::Subscribe { reply } => {
                let receiver = self.broadcast_tx.subscribe();
                let _ = reply.send((receiver, self.snapshot()));
            }
        }
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            conversations: self.store.list_conversations().to_vec(),
            current_id: self.store.current_id(),
            is_typing: self.store.is_typing(),
        }
    }

    fn send_message(&mut self, text: &str) -> Result<SendAck, StoreError> {
        match self.store.send_message(text)? {
            SendOutcome::InputRejected => {
                tracing::debug!("Ignoring empty message");
                Ok(SendAck::rejected(
                    self.store.current_id(),
                    self.store.is_typing(),
                ))
            }
            SendOutcome::Accepted(receipt) => {
                let conversation_id = receipt.conversation_id;
                tracing::info!(
                    conv_id = %conversation_id,
                    message_id = %receipt.message_id,
                    pending = self
                        .store
                        .exchange(conversation_id)
                        .map_or(0, ExchangeState::pending_count),
                    "User message appended"
                );

                if receipt.created {
                    let title = self
                        .store
                        .conversation(conversation_id)
                        .map(|c| c.title.clone())
                        .unwrap_or_default();
                    self.emit(StoreEvent::ConversationCreated {
                        conversation_id,
                        title,
                    });
                    self.emit(StoreEvent::CurrentChanged { conversation_id });
                }

                self.apply_changes(receipt.changes);
                Ok(SendAck {
                    accepted: true,
                    conversation_id: Some(conversation_id),
                    is_typing: self.store.is_typing(),
                })
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion {
            conversation_id,
            reply_to,
            event,
        } = completion;

        if self
            .in_flight
            .get(&conversation_id)
            .is_some_and(|(pending, _)| *pending == reply_to)
        {
            self.in_flight.remove(&conversation_id);
        }

        match self.store.dispatch(conversation_id, event) {
            Ok(changes) => self.apply_changes(changes),
            Err(StoreError::Transition(TransitionError::StaleResponse(id))) => {
                tracing::debug!(conv_id = %conversation_id, reply_to = %id, "Dropping stale reply");
            }
            Err(e) => {
                tracing::warn!(conv_id = %conversation_id, error = %e, "Failed to apply reply");
            }
        }
    }

    fn apply_changes(&mut self, changes: Vec<Change>) {
        for change in changes {
            match change {
                Change::MessageAppended {
                    conversation_id,
                    message,
                } => self.emit(StoreEvent::MessageAppended {
                    conversation_id,
                    message,
                }),
                Change::TypingChanged {
                    conversation_id,
                    typing,
                } => self.emit(StoreEvent::TypingChanged {
                    conversation_id,
                    typing,
                }),
                Change::ResponseRequested { reply_to, request } => {
                    self.request_response(reply_to, request);
                }
                Change::ResponseAborted {
                    conversation_id,
                    reply_to,
                } => {
                    if let Some((pending, token)) = self.in_flight.remove(&conversation_id) {
                        tracing::debug!(conv_id = %conversation_id, reply_to = %reply_to, "Aborting reply");
                        debug_assert_eq!(pending, reply_to);
                        token.cancel();
                    }
                }
            }
        }
    }

    fn request_response(&mut self, reply_to: MessageId, request: ResponseRequest) {
        let conversation_id = request.conversation_id;
        let cancel_token = CancellationToken::new();
        if let Some((_, previous)) = self
            .in_flight
            .insert(conversation_id, (reply_to, cancel_token.clone()))
        {
            previous.cancel();
        }

        let responder = Arc::clone(&self.responder);
        let completion_tx = self.completion_tx.clone();
        let timeout = self.response_timeout;

        tokio::spawn(async move {
            tracing::debug!(
                conv_id = %conversation_id,
                reply_to = %reply_to,
                history_len = request.history.len(),
                "Requesting reply (background)"
            );

            // Race the responder against cancellation
            let event = tokio::select! {
                biased;

                () = cancel_token.cancelled() => {
                    tracing::info!(conv_id = %conversation_id, reply_to = %reply_to, "Reply cancelled");
                    return;
                }

                result = tokio::time::timeout(timeout, responder.respond(&request)) => match result {
                    Ok(Ok(text)) => Event::ResponseReady { reply_to, text },
                    Ok(Err(error)) => Event::ResponseFailed { reply_to, error },
                    Err(_) => {
                        tracing::warn!(
                            conv_id = %conversation_id,
                            timeout_ms = %timeout.as_millis(),
                            "Reply timed out"
                        );
                        Event::ResponseFailed {
                            reply_to,
                            error: ResponderError::timeout(format!(
                                "No reply within {}ms",
                                timeout.as_millis()
                            )),
                        }
                    }
                },
            };

            let _ = completion_tx
                .send(Completion {
                    conversation_id,
                    reply_to,
                    event,
                })
                .await;
        });
    }

    fn report(&self, error: &StoreError) {
        tracing::warn!(error = %error, "Rejected store command");
        self.emit(StoreEvent::Error {
            message: error.to_string(),
        });
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}
