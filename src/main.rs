//! UNI360 assistant - conversation store for a study-abroad chat assistant
//!
//! Holds conversations in memory, answers each user message through a
//! pluggable responder and serves the store over HTTP with live updates.

mod api;
mod config;
mod responder;
mod runtime;
mod state_machine;
mod store;
mod title;

use api::{create_router, AppState};
use config::AppConfig;
use runtime::StoreRuntime;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uni360_assistant=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env();
    tracing::info!(
        port = config.port,
        responder = ?config.responder.kind,
        latency_ms = %config.responder.latency.as_millis(),
        timeout_ms = %config.responder.timeout.as_millis(),
        "Configuration loaded"
    );

    // Store runtime
    let responder = responder::build_responder(&config.responder);
    let store = StoreRuntime::spawn(responder, config.responder.timeout);
    let state = AppState::new(store);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("UNI360 assistant listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
