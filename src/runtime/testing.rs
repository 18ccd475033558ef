//! Mock implementations for testing
//!
//! These mocks drive the store runtime without network I/O.

use crate::responder::{Responder, ResponderError, ResponseRequest};
use crate::runtime::{StoreEvent, StoreHandle, StoreRuntime};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock Responder
// ============================================================================

/// Mock responder that returns queued replies after an optional delay
pub struct MockResponder {
    replies: Mutex<VecDeque<Result<String, ResponderError>>>,
    delay: Duration,
    /// Record of all requests made
    pub requests: Mutex<Vec<ResponseRequest>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self::delayed(Duration::ZERO)
    }

    /// Responder that waits `delay` before answering
    pub fn delayed(delay: Duration) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            delay,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    /// Queue a failure
    pub fn queue_error(&self, error: ResponderError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ResponseRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ResponderError::network("No mock reply queued")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// Running store runtime with a subscribed observer
pub struct TestRuntime {
    pub handle: StoreHandle,
    pub events: broadcast::Receiver<StoreEvent>,
    pub responder: Arc<MockResponder>,
}

impl TestRuntime {
    pub fn new(responder: MockResponder) -> Self {
        Self::with_timeout(responder, Duration::from_secs(30))
    }

    pub fn with_timeout(responder: MockResponder, timeout: Duration) -> Self {
        let responder = Arc::new(responder);
        let handle = StoreRuntime::spawn(responder.clone(), timeout);
        let events = handle.subscribe();
        Self {
            handle,
            events,
            responder,
        }
    }

    /// Collect events until the typing indicator turns off
    pub async fn wait_until_idle(&mut self) -> Vec<StoreEvent> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(120), self.events.recv())
                .await
                .expect("timed out waiting for store events")
                .expect("event stream closed");
            let done = matches!(event, StoreEvent::TypingChanged { typing: false, .. });
            seen.push(event);
            if done {
                return seen;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::CannedResponder;
    use crate::runtime::RuntimeError;
    use crate::state_machine::transition::CANCELLED_NOTICE;
    use crate::state_machine::TransitionError;
    use crate::store::{ConversationId, Sender, StoreError};

    #[tokio::test]
    async fn test_mock_responder() {
        let mock = MockResponder::new();
        mock.queue_reply("Hello");

        let request = ResponseRequest::new(ConversationId(1), &[], "hi");
        assert_eq!(mock.respond(&request).await.unwrap(), "Hello");
        assert!(mock.respond(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_message_with_canned_latency() {
        let handle = StoreRuntime::spawn(
            Arc::new(CannedResponder::new(Duration::from_millis(1500))),
            Duration::from_secs(30),
        );
        let mut events = handle.subscribe();

        let ack = handle.send_message("How do I apply?").await.unwrap();
        assert!(ack.accepted);
        assert!(ack.is_typing);

        let list = handle.list_conversations().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].messages.len(), 1);
        assert!(handle.is_typing().await.unwrap());

        loop {
            if let StoreEvent::TypingChanged { typing: false, .. } = events.recv().await.unwrap() {
                break;
            }
        }

        let current = handle.current().await.unwrap().unwrap();
        assert_eq!(current.messages.len(), 2);
        assert_eq!(current.messages[1].sender, Sender::Assistant);
        assert!(!current.messages[1].is_error);
        assert!(!handle.is_typing().await.unwrap());
    }

    #[tokio::test]
    async fn test_observer_sees_events_in_order() {
        let mock = MockResponder::new();
        mock.queue_reply("Hi there");
        let mut rt = TestRuntime::new(mock);

        rt.handle.send_message("hello").await.unwrap();
        let events = rt.wait_until_idle().await;

        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                StoreEvent::ConversationCreated { .. } => "created",
                StoreEvent::CurrentChanged { .. } => "current",
                StoreEvent::MessageAppended { .. } => "message",
                StoreEvent::TypingChanged { typing: true, .. } => "typing_on",
                StoreEvent::TypingChanged { typing: false, .. } => "typing_off",
                StoreEvent::Error { .. } => "error",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["created", "current", "message", "typing_on", "message", "typing_off"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_and_subscription_do_not_overlap() {
        let mock = MockResponder::delayed(Duration::from_secs(2));
        mock.queue_reply("Start with your transcripts.");
        let rt = TestRuntime::new(mock);

        rt.handle.send_message("hello").await.unwrap();
        let (mut events, snapshot) = rt.handle.subscribe_with_snapshot().await.unwrap();

        assert!(snapshot.is_typing);
        let current = snapshot.current().unwrap();
        assert_eq!(current.messages.len(), 1);
        let user_id = current.messages[0].id;

        let mut streamed = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                StoreEvent::MessageAppended { message, .. } => streamed.push(message),
                StoreEvent::TypingChanged { typing: false, .. } => break,
                _ => {}
            }
        }

        assert_eq!(streamed.len(), 1);
        assert_ne!(streamed[0].id, user_id);
        assert_eq!(streamed[0].sender, Sender::Assistant);
        assert_eq!(streamed[0].content, "Start with your transcripts.");
    }

    #[tokio::test]
    async fn test_snapshot_reads_one_store_state() {
        let mock = MockResponder::new();
        mock.queue_reply("ok");
        let mut rt = TestRuntime::new(mock);

        assert_eq!(rt.handle.snapshot().await.unwrap().current(), None);

        rt.handle.send_message("hello").await.unwrap();
        rt.wait_until_idle().await;

        let snapshot = rt.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.conversations.len(), 1);
        assert!(!snapshot.is_typing);
        assert_eq!(
            snapshot.current(),
            rt.handle.current().await.unwrap().as_ref()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_sends_answered_in_order() {
        let mock = MockResponder::delayed(Duration::from_millis(20));
        mock.queue_reply("first answer");
        mock.queue_reply("second answer");
        let mut rt = TestRuntime::new(mock);

        rt.handle.send_message("first").await.unwrap();
        rt.handle.send_message("second").await.unwrap();
        assert_eq!(
            rt.handle.current().await.unwrap().unwrap().messages.len(),
            2
        );

        rt.wait_until_idle().await;

        let messages = rt.handle.current().await.unwrap().unwrap().messages;
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["first", "second", "first answer", "second answer"]
        );

        // The queued message was requested with the first exchange as history
        let requests = rt.responder.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].message, "second");
        assert_eq!(requests[1].history.len(), 2);
    }

    #[tokio::test]
    async fn test_responder_failure_becomes_inline_error() {
        let mock = MockResponder::new();
        mock.queue_error(ResponderError::status("HTTP 502: upstream down"));
        let mut rt = TestRuntime::new(mock);

        rt.handle.send_message("hi").await.unwrap();
        rt.wait_until_idle().await;

        let current = rt.handle.current().await.unwrap().unwrap();
        assert_eq!(current.messages.len(), 2);
        let reply = &current.messages[1];
        assert!(reply.is_error);
        assert_eq!(reply.sender, Sender::Assistant);
        assert!(!rt.handle.is_typing().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_responder_times_out() {
        let mock = MockResponder::delayed(Duration::from_secs(60));
        mock.queue_reply("too late");
        let mut rt = TestRuntime::with_timeout(mock, Duration::from_secs(5));

        rt.handle.send_message("hi").await.unwrap();
        rt.wait_until_idle().await;

        let current = rt.handle.current().await.unwrap().unwrap();
        let reply = &current.messages[1];
        assert!(reply.is_error);
        assert_eq!(
            reply.content,
            ResponderError::timeout("").notice()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_appends_notice_and_drops_late_reply() {
        let mock = MockResponder::delayed(Duration::from_secs(10));
        mock.queue_reply("late reply");
        let mut rt = TestRuntime::new(mock);

        let ack = rt.handle.send_message("hi").await.unwrap();
        let id = ack.conversation_id.unwrap();
        rt.handle.cancel(id).await.unwrap();
        rt.wait_until_idle().await;

        // Let the aborted responder's deadline pass
        tokio::time::sleep(Duration::from_secs(20)).await;

        let current = rt.handle.current().await.unwrap().unwrap();
        assert_eq!(current.messages.len(), 2);
        assert_eq!(current.messages[1].content, CANCELLED_NOTICE);
        assert!(current.messages[1].is_error);
    }

    #[tokio::test]
    async fn test_cancel_without_pending_reply_is_rejected() {
        let rt = TestRuntime::new(MockResponder::new());
        let conversation = rt.handle.create_conversation().await.unwrap();

        let err = rt.handle.cancel(conversation.id).await.unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Store(StoreError::Transition(TransitionError::NothingPending))
        );
    }

    #[tokio::test]
    async fn test_whitespace_send_is_not_accepted() {
        let rt = TestRuntime::new(MockResponder::new());

        let ack = rt.handle.send_message("   ").await.unwrap();
        assert!(!ack.accepted);
        assert_eq!(ack.conversation_id, None);
        assert!(rt.handle.list_conversations().await.unwrap().is_empty());
        assert!(rt.handle.current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_and_select() {
        let rt = TestRuntime::new(MockResponder::new());
        let first = rt.handle.create_conversation().await.unwrap();
        let second = rt.handle.create_conversation().await.unwrap();

        let list = rt.handle.list_conversations().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);

        rt.handle.select_conversation(first.id).await.unwrap();
        assert_eq!(rt.handle.current().await.unwrap().unwrap().id, first.id);

        let err = rt
            .handle
            .select_conversation(ConversationId(404))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Store(StoreError::UnknownConversation(_))
        ));
        assert_eq!(rt.handle.current().await.unwrap().unwrap().id, first.id);
    }
}
