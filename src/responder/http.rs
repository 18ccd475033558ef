//! HTTP responder for an external chat service
//!
//! Posts `{conversation_id, history, message}` as JSON and expects
//! `{"reply": "..."}` back.

use super::{Responder, ResponderError, ResponseRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ReplyBody {
    reply: String,
}

/// Responder backed by a JSON-over-HTTP chat endpoint
pub struct HttpResponder {
    client: Client,
    url: String,
}

impl HttpResponder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ResponderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResponderError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

fn classify_send_error(e: &reqwest::Error) -> ResponderError {
    if e.is_timeout() {
        ResponderError::timeout(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        ResponderError::network(format!("Connection failed: {e}"))
    } else {
        ResponderError::network(format!("Request failed: {e}"))
    }
}

fn parse_reply(body: &str) -> Result<String, ResponderError> {
    let parsed: ReplyBody = serde_json::from_str(body).map_err(|e| {
        ResponderError::invalid_response(format!("Failed to parse response: {e} - body: {body}"))
    })?;
    let reply = parsed.reply.trim();
    if reply.is_empty() {
        return Err(ResponderError::invalid_response("Empty reply"));
    }
    Ok(reply.to_string())
}

#[async_trait]
impl Responder for HttpResponder {
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ResponderError::timeout(format!("Response timeout: {e}"))
            } else {
                ResponderError::network(format!("Failed to read response: {e}"))
            }
        })?;

        if !status.is_success() {
            return Err(ResponderError::status(format!("HTTP {status}: {body}")));
        }

        parse_reply(&body)
    }

    fn name(&self) -> &str {
        "http"
    }
}
