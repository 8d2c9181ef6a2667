//! ConversationRepository trait definition.
//!
//! The narrow persistence interface for conversation turns: append,
//! ordered history, windowed history, feedback attachment, and retention
//! purge. Implementations live in concierge-infra (e.g.,
//! `SqliteConversationRepository`). Uses native async fn in traits
//! (RPITIT, Rust 2024 edition).

use chrono::{DateTime, Utc};
use concierge_types::error::RepositoryError;
use concierge_types::turn::Turn;
use uuid::Uuid;

/// Repository trait for conversation turn persistence.
pub trait ConversationRepository: Send + Sync {
    /// Append a completed turn. Returns the turn id.
    fn append(
        &self,
        turn: &Turn,
    ) -> impl std::future::Future<Output = Result<Uuid, RepositoryError>> + Send;

    /// Get turns for a session, ordered by created_at ASC.
    ///
    /// An unknown session yields an empty list, not an error.
    fn history(
        &self,
        session_id: &Uuid,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Get the most recent `window` turns of a session, ordered by
    /// created_at ASC. Bounds the prompt independent of session length.
    fn latest_window(
        &self,
        session_id: &Uuid,
        window: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Set rating and feedback text on the most recently created turn of
    /// a session. Fails with [`RepositoryError::NotFound`] if the session
    /// has no turns.
    fn attach_feedback(
        &self,
        session_id: &Uuid,
        rating: u8,
        feedback_text: Option<String>,
    ) -> impl std::future::Future<Output = Result<Turn, RepositoryError>> + Send;

    /// Delete turns created before the cutoff. Returns how many were removed.
    fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
