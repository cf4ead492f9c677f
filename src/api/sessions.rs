//! Session endpoints: start a conversation, send messages, read state.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::conversation::{SessionId, SessionSnapshot, TurnReply};

use super::AppState;
use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// POST /api/sessions
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<TurnReply>) {
    let reply = state.manager.start_session().await;
    (StatusCode::CREATED, Json(reply))
}

/// POST /api/sessions/{id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<TurnReply>, ApiError> {
    let Json(body) = payload?;
    let reply = state
        .manager
        .handle_message(&SessionId::from(id), &body.text)
        .await?;
    Ok(Json(reply))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state.manager.snapshot(&SessionId::from(id)).await?;
    Ok(Json(snapshot))
}
