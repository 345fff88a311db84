//! HTTP routes
//!
//! - `/` - Chat page
//! - `/api/chat` - Chat history (GET) and question submission (POST)
//! - `/api/samples` - Sidebar sample questions
//! - `/api/health` - Health check

pub mod chat;
pub mod health;
pub mod ui;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    info!("Creating application router");

    Router::new()
        .merge(chat::router(state.clone()))
        .merge(health::router(state))
        .merge(ui::router())
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
