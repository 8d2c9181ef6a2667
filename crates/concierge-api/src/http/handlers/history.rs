//! History read endpoint handler.
//!
//! GET /history/{sessionId} - full ordered transcript of a session.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use concierge_core::chat::session::validate_session_id;
use concierge_types::turn::Turn;

use crate::http::error::AppError;
use crate::state::AppState;

/// Response body for GET /history/{sessionId}.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub messages: Vec<Turn>,
    pub count: usize,
}

/// GET /history/{sessionId} - return the session transcript, oldest first.
///
/// An unknown (but well-formed) session id returns an empty transcript, not
/// a 404: the widget polls history before the first turn exists.
pub async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session_id =
        validate_session_id(&session_id).map_err(|e| AppError::Validation(e.to_string()))?;

    let messages = state.chat_service.session_history(&session_id).await?;
    let count = messages.len();

    Ok(Json(HistoryResponse {
        session_id,
        messages,
        count,
    }))
}
