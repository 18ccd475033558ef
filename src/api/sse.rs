//! Server-Sent Events support

use crate::runtime::{StoreEvent, StoreSnapshot};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream, led by an init snapshot.
///
/// `broadcast_rx` must have been subscribed in the same runtime step that
/// took `snapshot`, otherwise events can be missed or replayed.
pub fn sse_stream(
    snapshot: StoreSnapshot,
    broadcast_rx: tokio::sync::broadcast::Receiver<StoreEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(init_event(&snapshot)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(store_event_to_axum(&event))),
        Err(e) => {
            tracing::warn!(error = %e, "SSE observer lagged, skipping events");
            None
        }
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_event(init: &StoreSnapshot) -> Event {
    let data = json!({
        "type": "init",
        "conversations": init.conversations,
        "current_id": init.current_id,
        "is_typing": init.is_typing,
    });
    Event::default().event("init").data(data.to_string())
}

fn event_name(event: &StoreEvent) -> &'static str {
    match event {
        StoreEvent::ConversationCreated { .. } => "conversation_created",
        StoreEvent::CurrentChanged { .. } => "current_changed",
        StoreEvent::MessageAppended { .. } => "message",
        StoreEvent::TypingChanged { .. } => "typing",
        StoreEvent::Error { .. } => "error",
    }
}

fn store_event_to_axum(event: &StoreEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event_name(event)).data(data)
}
