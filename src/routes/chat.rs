use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use crate::models::{AppState, ChatHistoryResponse, ChatMessage, ChatRequest, ChatResponse};
use crate::rag::Answer;
use crate::session::SAMPLE_QUESTIONS;
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", get(get_chat).post(post_chat))
        .route("/api/samples", get(get_samples))
        .with_state(state)
}

async fn get_chat(State(state): State<AppState>) -> Json<ChatHistoryResponse> {
    Json(ChatHistoryResponse {
        messages: state.session.messages().await,
    })
}

async fn get_samples() -> Json<Vec<&'static str>> {
    Json(SAMPLE_QUESTIONS.to_vec())
}

pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let question = request.message.trim().to_string();
    if question.is_empty() {
        return Err(AppError::InvalidRequest("Message must not be empty".to_string()));
    }

    info!(message_len = question.len(), "Received chat message");
    state.session.push(ChatMessage::user(&question)).await;

    let source = match answer(&state, &question).await {
        Ok(answer) => {
            info!(source = ?answer.source, chunks = answer.chunks.len(), "Answer ready");
            state.session.push(ChatMessage::assistant(answer.content)).await;
            Some(answer.source)
        }
        Err(e) => {
            error!(error = %e, "Failed to answer chat message");
            state
                .session
                .push(ChatMessage::assistant(format!(
                    "Sorry, I encountered an error: {}. Please try again later.",
                    e
                )))
                .await;
            None
        }
    };

    Ok(Json(ChatResponse {
        messages: state.session.messages().await,
        source,
    }))
}

async fn answer(state: &AppState, question: &str) -> AppResult<Answer> {
    state.engine.check_connection().await.map_err(|e| {
        error!(error = %e, "Model API connectivity check failed");
        AppError::LLMApi("API connection failed. Please check your API key".to_string())
    })?;

    state.engine.ask(question).await
}
