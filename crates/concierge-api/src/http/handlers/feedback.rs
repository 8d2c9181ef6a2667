//! Feedback endpoint handler.
//!
//! POST /feedback - attach a rating and optional free-text feedback to the
//! most recent turn of a session.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use concierge_core::chat::session::validate_session_id;

use crate::http::error::AppError;
use crate::http::extract::AppJson;
use crate::state::AppState;

/// Request body for POST /feedback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub session_id: String,
    pub rating: u8,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Response body for POST /feedback.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub session_id: Uuid,
    pub turn_id: Uuid,
    pub rating: u8,
    pub timestamp: DateTime<Utc>,
}

/// POST /feedback - record feedback against the latest turn of a session.
pub async fn feedback(
    State(state): State<AppState>,
    AppJson(request): AppJson<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let session_id = validate_session_id(&request.session_id)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let turn = state
        .chat_service
        .attach_feedback(&session_id, request.rating, request.feedback)
        .await?;

    tracing::info!(
        session_id = %session_id,
        rating = request.rating,
        "feedback recorded"
    );

    Ok(Json(FeedbackResponse {
        session_id,
        turn_id: turn.id,
        rating: request.rating,
        timestamp: Utc::now(),
    }))
}
