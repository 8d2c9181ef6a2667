use thiserror::Error;

use crate::llm::ProviderError;

/// Errors from repository operations (used by trait definitions in concierge-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// A session identifier that is not a well-formed UUID-v4.
#[derive(Debug, Error)]
#[error("invalid session id: '{0}'")]
pub struct InvalidSessionId(pub String);

/// Terminal failures of one chat orchestration pass.
///
/// Only failures that must surface to the HTTP caller appear here; an
/// unavailable provider is downgraded inside the service to a fallback
/// reply and never reaches this type.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    InvalidSessionId(#[from] InvalidSessionId),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("provider quota exhausted")]
    ProviderQuotaExceeded,

    #[error("provider rate limited")]
    ProviderRateLimited,

    #[error(transparent)]
    Provider(ProviderError),
}

/// Failures of the feedback-attachment path.
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error(transparent)]
    InvalidSessionId(#[from] InvalidSessionId),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("no turns recorded for session")]
    SessionNotFound,

    #[error("storage error: {0}")]
    Storage(String),
}
