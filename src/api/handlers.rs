//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CancelResponse, ChatRequest, ChatResponse, ConversationListResponse, ConversationResponse,
    CurrentResponse, ErrorResponse,
};
use super::AppState;
use crate::runtime::RuntimeError;
use crate::state_machine::TransitionError;
use crate::store::{ConversationId, StoreError};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversation listing and creation
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route("/api/conversations/current", get(get_current))
        .route("/api/conversations/:id", get(get_conversation))
        // Selection and cancellation
        .route("/api/conversations/:id/select", post(select_conversation))
        .route("/api/conversations/:id/cancel", post(cancel_conversation))
        // Messages
        .route("/api/chat", post(send_chat))
        // SSE streaming
        .route("/api/stream", get(stream_events))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversations
// ============================================================

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let conversations = state.store.list_conversations().await?;
    Ok(Json(ConversationListResponse { conversations }))
}

async fn create_conversation(
    State(state): State<AppState>,
) -> Result<Json<ConversationResponse>, AppError> {
    let conversation = state.store.create_conversation().await?;
    Ok(Json(ConversationResponse { conversation }))
}

async fn get_current(State(state): State<AppState>) -> Result<Json<CurrentResponse>, AppError> {
    let snapshot = state.store.snapshot().await?;
    Ok(Json(CurrentResponse {
        conversation: snapshot.current().cloned(),
        is_typing: snapshot.is_typing,
    }))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ConversationResponse>, AppError> {
    let id = ConversationId(id);
    let conversation = state
        .store
        .conversation(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Conversation not found: {id}")))?;
    Ok(Json(ConversationResponse { conversation }))
}

async fn select_conversation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ConversationResponse>, AppError> {
    let conversation = state
        .store
        .select_conversation(ConversationId(id))
        .await?;
    Ok(Json(ConversationResponse { conversation }))
}

async fn cancel_conversation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<CancelResponse>, AppError> {
    state.store.cancel(ConversationId(id)).await?;
    Ok(Json(CancelResponse { ok: true }))
}

// ============================================================
// Messages
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let ack = state.store.send_message(req.text).await?;
    Ok(Json(ChatResponse {
        accepted: ack.accepted,
        conversation_id: ack.conversation_id,
        is_typing: ack.is_typing,
    }))
}

// ============================================================
// Streaming
// ============================================================

async fn stream_events(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let (broadcast_rx, snapshot) = state.store.subscribe_with_snapshot().await?;
    Ok(sse_stream(snapshot, broadcast_rx))
}

async fn get_version() -> &'static str {
    concat!("uni360-assistant ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Store(StoreError::UnknownConversation(_)) => {
                AppError::NotFound(e.to_string())
            }
            RuntimeError::Store(StoreError::Transition(TransitionError::NothingPending)) => {
                AppError::Conflict(e.to_string())
            }
            RuntimeError::Store(StoreError::Transition(TransitionError::StaleResponse(_))) => {
                AppError::BadRequest(e.to_string())
            }
            RuntimeError::Closed => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
