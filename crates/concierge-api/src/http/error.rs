//! Application error type mapping to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use concierge_types::error::{ChatError, FeedbackError, RepositoryError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Request failed validation (bad session id, empty message, bad rating).
    Validation(String),
    /// This client exceeded the per-client request ceiling.
    RateLimitExceeded,
    /// Upstream provider rejected the request as rate limited.
    ProviderRateLimited,
    /// Upstream provider quota is exhausted.
    ProviderQuotaExceeded,
    /// The referenced session has no recorded turns.
    SessionNotFound,
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::InvalidSessionId(err) => AppError::Validation(err.to_string()),
            ChatError::Validation(msg) => AppError::Validation(msg),
            ChatError::ProviderQuotaExceeded => AppError::ProviderQuotaExceeded,
            ChatError::ProviderRateLimited => AppError::ProviderRateLimited,
            ChatError::Provider(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<FeedbackError> for AppError {
    fn from(e: FeedbackError) -> Self {
        match e {
            FeedbackError::InvalidSessionId(err) => AppError::Validation(err.to_string()),
            FeedbackError::Validation(msg) => AppError::Validation(msg),
            FeedbackError::SessionNotFound => AppError::SessionNotFound,
            FeedbackError::Storage(msg) => AppError::Internal(msg),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Too many requests, slow down".to_string(),
            ),
            AppError::ProviderRateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "PROVIDER_RATE_LIMITED",
                "The assistant is receiving too many requests, try again shortly".to_string(),
            ),
            AppError::ProviderQuotaExceeded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PROVIDER_QUOTA_EXCEEDED",
                "The assistant is temporarily unavailable".to_string(),
            ),
            AppError::SessionNotFound => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                "No conversation recorded for this session".to_string(),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, axum::Json(body)).into_response()
    }
}
