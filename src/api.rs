//! HTTP API for the conversation store

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::StoreHandle;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: StoreHandle,
}

impl AppState {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }
}
