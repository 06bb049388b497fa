use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::routes::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatData {
    pub response: String,
    pub timestamp: String,
    pub context: String,
    pub fallback: bool,
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ApiResponse<ChatData>>> {
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("Message is required".to_string()))?;

    let reply = state.ai.chat(message, request.context.as_deref()).await;

    Ok(Json(ApiResponse::ok(ChatData {
        response: reply.response,
        timestamp: Utc::now().to_rfc3339(),
        context: request.context.unwrap_or_else(|| "general".to_string()),
        fallback: reply.fallback,
    })))
}
