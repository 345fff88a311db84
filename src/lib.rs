// Policy RAG - question answering over a home insurance policy document

pub mod config;
pub mod types;
pub mod models;
pub mod session;
pub mod llm;
pub mod embeddings;
pub mod rag;
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use rag::RagEngine;

pub fn create_router(state: AppState, allowed_origins: &[String]) -> axum::Router {
    routes::create_router(state, allowed_origins)
}
