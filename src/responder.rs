//! Responder abstraction
//!
//! The seam to the conversational AI service. The store hands over the
//! conversation history plus the new user message and gets back reply text.

mod canned;
mod error;
mod http;

pub use canned::CannedResponder;
pub use error::{ResponderError, ResponderErrorKind};
pub use http::HttpResponder;

use crate::config::{ResponderConfig, ResponderKind};
use crate::store::{ConversationId, Message, Sender};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One prior turn as sent to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Sender,
    pub content: String,
}

/// Reply request: the history before the new message, plus the message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRequest {
    pub conversation_id: ConversationId,
    pub history: Vec<HistoryEntry>,
    pub message: String,
}

impl ResponseRequest {
    /// Build a request from stored messages. Error notices are not part of
    /// the dialogue and are left out of the history.
    pub fn new(conversation_id: ConversationId, history: &[Message], message: &str) -> Self {
        Self {
            conversation_id,
            history: history
                .iter()
                .filter(|m| !m.is_error)
                .map(|m| HistoryEntry {
                    role: m.sender,
                    content: m.content.clone(),
                })
                .collect(),
            message: message.to_string(),
        }
    }
}

/// Common interface for reply producers
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce the assistant reply for a request
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Responder + ?Sized> Responder for Arc<T> {
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError> {
        (**self).respond(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logging wrapper for responders
pub struct LoggingResponder {
    inner: Arc<dyn Responder>,
    name: String,
}

impl LoggingResponder {
    pub fn new(inner: Arc<dyn Responder>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl Responder for LoggingResponder {
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError> {
        let start = std::time::Instant::now();
        let result = self.inner.respond(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    responder = %self.name,
                    conv_id = %request.conversation_id,
                    duration_ms = %duration.as_millis(),
                    history_len = request.history.len(),
                    reply_len = reply.len(),
                    "Reply produced"
                );
            }
            Err(e) => {
                tracing::error!(
                    responder = %self.name,
                    conv_id = %request.conversation_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    "Reply failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the configured responder, wrapped for logging
pub fn build_responder(config: &ResponderConfig) -> Arc<dyn Responder> {
    let inner: Arc<dyn Responder> = match (&config.kind, &config.url) {
        (ResponderKind::Http, Some(url)) => match HttpResponder::new(url, config.timeout) {
            Ok(responder) => Arc::new(responder),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build HTTP responder, using canned replies");
                Arc::new(CannedResponder::new(config.latency))
            }
        },
        (ResponderKind::Http, None) => {
            tracing::warn!("UNI360_RESPONDER=http but UNI360_RESPONDER_URL is unset, using canned replies");
            Arc::new(CannedResponder::new(config.latency))
        }
        (ResponderKind::Canned, _) => Arc::new(CannedResponder::new(config.latency)),
    };
    Arc::new(LoggingResponder::new(inner))
}
