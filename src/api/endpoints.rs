//! Stateless widget endpoints: chat, preference extraction, lead and
//! conversation saves, health.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::conversation::{SessionId, TranscriptEntry};
use crate::store::Row;

use super::AppState;
use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<TranscriptEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub messages: Vec<TranscriptEntry>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Deserialize)]
pub struct SaveLeadRequest {
    pub session_id: String,
    #[serde(default)]
    pub lead_data: Row,
}

#[derive(Debug, Deserialize)]
pub struct SaveConversationRequest {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<TranscriptEntry>,
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }
    let response = state.chat.converse(&body.message, &body.history).await?;
    Ok(Json(json!({ "response": response })))
}

/// POST /api/extract-preferences
pub async fn extract_preferences(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let preferences = state
        .extractor
        .extract(&body.messages, body.session_id.as_ref())
        .await?;
    Ok(Json(json!({ "preferences": preferences })))
}

/// POST /api/save-lead
pub async fn save_lead(
    State(state): State<AppState>,
    payload: Result<Json<SaveLeadRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let data = state
        .persistence
        .save_lead(&body.session_id, body.lead_data)
        .await?;
    info!(session_id = %body.session_id, "Lead saved");
    Ok(Json(json!({ "success": true, "data": data })))
}

/// POST /api/save-conversation
pub async fn save_conversation(
    State(state): State<AppState>,
    payload: Result<Json<SaveConversationRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let data = state
        .persistence
        .save_transcript(&body.session_id, &body.messages)
        .await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "realtech-assist",
        "llm_configured": state.chat.is_configured(),
        "storage_configured": state.persistence.is_configured(),
    }))
}

/// Bare OPTIONS on any endpoint.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any verb an endpoint does not serve.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
