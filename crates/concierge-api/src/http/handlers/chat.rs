//! Chat endpoint handler.
//!
//! POST /chat - run one orchestration pass: rate limit by client address,
//! resolve the session, generate a reply, persist the turn.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use concierge_types::turn::{ReplyKind, TokenUsage, TurnContext};

use crate::http::error::AppError;
use crate::http::extract::AppJson;
use crate::state::AppState;

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: Option<TurnContext>,
}

/// Response body for POST /chat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub usage: TokenUsage,
}

/// POST /chat - handle one inbound chat message.
///
/// The rate limit is checked first, keyed by client IP, so a throttled
/// client causes no provider call and no persisted turn.
pub async fn chat(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let client_ip = addr.ip().to_string();

    if !state.limiter.allow(&client_ip) {
        tracing::debug!(client = %client_ip, "rate limit exceeded");
        return Err(AppError::RateLimitExceeded);
    }

    let reply = state
        .chat_service
        .handle_message(
            request.session_id.as_deref(),
            &request.message,
            request.context,
            &client_ip,
        )
        .await?;

    Ok(Json(ChatResponse {
        response: reply.text,
        session_id: reply.session_id,
        kind: reply.kind,
        confidence: reply.confidence,
        timestamp: reply.created_at,
        model: reply.model,
        usage: reply.usage,
    }))
}
