//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `concierge-core` using sqlx with
//! split read/write pools: raw queries, a private Row struct for
//! SQLite-to-domain mapping, reads on the reader pool and writes on the
//! writer pool.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use concierge_core::chat::repository::ConversationRepository;
use concierge_types::error::RepositoryError;
use concierge_types::turn::{ReplyKind, TokenUsage, Turn, TurnContext};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain Turn.
struct TurnRow {
    id: String,
    session_id: String,
    user_message: String,
    ai_response: String,
    created_at: String,
    client_address: String,
    context: Option<String>,
    model_name: String,
    prompt_tokens: i64,
    completion_tokens: i64,
    total_tokens: i64,
    reply_kind: String,
    rating: Option<i64>,
    feedback_text: Option<String>,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            user_message: row.try_get("user_message")?,
            ai_response: row.try_get("ai_response")?,
            created_at: row.try_get("created_at")?,
            client_address: row.try_get("client_address")?,
            context: row.try_get("context")?,
            model_name: row.try_get("model_name")?,
            prompt_tokens: row.try_get("prompt_tokens")?,
            completion_tokens: row.try_get("completion_tokens")?,
            total_tokens: row.try_get("total_tokens")?,
            reply_kind: row.try_get("reply_kind")?,
            rating: row.try_get("rating")?,
            feedback_text: row.try_get("feedback_text")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid turn id: {e}")))?;
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;
        let context: Option<TurnContext> = self
            .context
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid context json: {e}")))?;
        let reply_kind: ReplyKind = self
            .reply_kind
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Turn {
            id,
            session_id,
            user_message: self.user_message,
            ai_response: self.ai_response,
            created_at,
            client_address: self.client_address,
            context,
            model_name: self.model_name,
            usage: TokenUsage {
                prompt: self.prompt_tokens as u32,
                completion: self.completion_tokens as u32,
                total: self.total_tokens as u32,
            },
            reply_kind,
            rating: self.rating.map(|v| v as u8),
            feedback_text: self.feedback_text,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn context_json(context: Option<&TurnContext>) -> Result<Option<String>, RepositoryError> {
    match context {
        Some(ctx) if !ctx.is_empty() => serde_json::to_string(ctx)
            .map(Some)
            .map_err(|e| RepositoryError::Query(format!("context serialization: {e}"))),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// ConversationRepository implementation
// ---------------------------------------------------------------------------

impl ConversationRepository for SqliteConversationRepository {
    async fn append(&self, turn: &Turn) -> Result<Uuid, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO conversation_turns
               (id, session_id, user_message, ai_response, created_at, client_address, context,
                model_name, prompt_tokens, completion_tokens, total_tokens, reply_kind, rating, feedback_text)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(turn.id.to_string())
        .bind(turn.session_id.to_string())
        .bind(&turn.user_message)
        .bind(&turn.ai_response)
        .bind(format_datetime(&turn.created_at))
        .bind(&turn.client_address)
        .bind(context_json(turn.context.as_ref())?)
        .bind(&turn.model_name)
        .bind(turn.usage.prompt as i64)
        .bind(turn.usage.completion as i64)
        .bind(turn.usage.total as i64)
        .bind(turn.reply_kind.to_string())
        .bind(turn.rating.map(|v| v as i64))
        .bind(&turn.feedback_text)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(turn.id)
    }

    async fn history(
        &self,
        session_id: &Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Turn>, RepositoryError> {
        let mut sql = String::from(
            "SELECT * FROM conversation_turns WHERE session_id = ? ORDER BY created_at ASC, id ASC",
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let rows = sqlx::query(&sql)
            .bind(session_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let turn_row =
                TurnRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(turn_row.into_turn()?);
        }

        Ok(turns)
    }

    async fn latest_window(
        &self,
        session_id: &Uuid,
        window: u32,
    ) -> Result<Vec<Turn>, RepositoryError> {
        // Newest N, then flipped back to ascending so callers see them in
        // conversation order.
        let rows = sqlx::query(
            r#"SELECT * FROM (
                   SELECT * FROM conversation_turns
                   WHERE session_id = ?
                   ORDER BY created_at DESC, id DESC
                   LIMIT ?
               ) ORDER BY created_at ASC, id ASC"#,
        )
        .bind(session_id.to_string())
        .bind(window as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let turn_row =
                TurnRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(turn_row.into_turn()?);
        }

        Ok(turns)
    }

    async fn attach_feedback(
        &self,
        session_id: &Uuid,
        rating: u8,
        feedback_text: Option<String>,
    ) -> Result<Turn, RepositoryError> {
        // One statement: the ack always describes the row that was rated,
        // even if another turn lands on the session concurrently.
        let row = sqlx::query(
            r#"UPDATE conversation_turns SET rating = ?, feedback_text = ?
               WHERE id = (
                   SELECT id FROM conversation_turns
                   WHERE session_id = ?
                   ORDER BY created_at DESC, id DESC
                   LIMIT 1
               )
               RETURNING *"#,
        )
        .bind(rating as i64)
        .bind(&feedback_text)
        .bind(session_id.to_string())
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let row = row.ok_or(RepositoryError::NotFound)?;
        let turn_row =
            TurnRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        turn_row.into_turn()
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM conversation_turns WHERE created_at < ?")
            .bind(format_datetime(&cutoff))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_turn(session_id: Uuid, user: &str, assistant: &str) -> Turn {
        Turn {
            id: Uuid::now_v7(),
            session_id,
            user_message: user.to_string(),
            ai_response: assistant.to_string(),
            created_at: Utc::now(),
            client_address: "203.0.113.9".to_string(),
            context: None,
            model_name: "gpt-4o-mini".to_string(),
            usage: TokenUsage::new(42, 17),
            reply_kind: ReplyKind::Bot,
            rating: None,
            feedback_text: None,
        }
    }

    #[tokio::test]
    async fn test_append_and_history_round_trip() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let sid = Uuid::new_v4();

        let mut turn = make_turn(sid, "How do I reset my password?", "Click 'Forgot password'.");
        turn.context = Some(TurnContext {
            page: Some("/account".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            referrer: None,
            extra: Default::default(),
        });

        repo.append(&turn).await.unwrap();

        let turns = repo.history(&sid, None).await.unwrap();
        assert_eq!(turns.len(), 1);
        let found = &turns[0];
        assert_eq!(found.id, turn.id);
        assert_eq!(found.user_message, "How do I reset my password?");
        assert_eq!(found.ai_response, "Click 'Forgot password'.");
        assert_eq!(found.usage.prompt, 42);
        assert_eq!(found.usage.total, 59);
        assert_eq!(found.reply_kind, ReplyKind::Bot);
        let ctx = found.context.as_ref().unwrap();
        assert_eq!(ctx.page.as_deref(), Some("/account"));
        assert_eq!(found.rating, None);
    }

    #[tokio::test]
    async fn test_history_is_ascending_and_scoped_to_session() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let sid = Uuid::new_v4();
        let other = Uuid::new_v4();

        for n in 0..3i64 {
            let mut turn = make_turn(sid, &format!("q{n}"), &format!("a{n}"));
            turn.created_at = Utc::now() + chrono::Duration::milliseconds(n);
            repo.append(&turn).await.unwrap();
        }
        repo.append(&make_turn(other, "other q", "other a")).await.unwrap();

        let turns = repo.history(&sid, None).await.unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].user_message, "q0");
        assert_eq!(turns[2].user_message, "q2");
    }

    #[tokio::test]
    async fn test_latest_window_keeps_newest_in_ascending_order() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let sid = Uuid::new_v4();

        for n in 0..15i64 {
            let mut turn = make_turn(sid, &format!("q{n}"), &format!("a{n}"));
            turn.created_at = Utc::now() + chrono::Duration::milliseconds(n);
            repo.append(&turn).await.unwrap();
        }

        let window = repo.latest_window(&sid, 10).await.unwrap();
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].user_message, "q5");
        assert_eq!(window[9].user_message, "q14");
    }

    #[tokio::test]
    async fn test_latest_window_for_unknown_session_is_empty() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let window = repo.latest_window(&Uuid::new_v4(), 10).await.unwrap();
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn test_attach_feedback_targets_latest_turn() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let sid = Uuid::new_v4();

        let mut first = make_turn(sid, "first", "first a");
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        repo.append(&first).await.unwrap();
        let second = make_turn(sid, "second", "second a");
        repo.append(&second).await.unwrap();

        let updated = repo
            .attach_feedback(&sid, 4, Some("helpful".to_string()))
            .await
            .unwrap();
        // The returned turn is the exact row the update hit.
        assert_eq!(updated.id, second.id);
        assert_eq!(updated.user_message, "second");
        assert_eq!(updated.rating, Some(4));
        assert_eq!(updated.feedback_text.as_deref(), Some("helpful"));

        let turns = repo.history(&sid, None).await.unwrap();
        assert_eq!(turns[0].rating, None);
        assert_eq!(turns[1].rating, Some(4));
    }

    #[tokio::test]
    async fn test_attach_feedback_unknown_session_is_not_found() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let err = repo.attach_feedback(&Uuid::new_v4(), 5, None).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_feedback_can_be_overwritten() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let sid = Uuid::new_v4();
        repo.append(&make_turn(sid, "q", "a")).await.unwrap();

        repo.attach_feedback(&sid, 2, Some("meh".to_string())).await.unwrap();
        let updated = repo.attach_feedback(&sid, 5, None).await.unwrap();
        assert_eq!(updated.rating, Some(5));
        assert_eq!(updated.feedback_text, None);
    }

    #[tokio::test]
    async fn test_purge_older_than_cutoff() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let sid = Uuid::new_v4();

        let mut old = make_turn(sid, "old", "old a");
        old.created_at = Utc::now() - chrono::Duration::days(100);
        repo.append(&old).await.unwrap();
        repo.append(&make_turn(sid, "recent", "recent a")).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(90);
        let removed = repo.purge_older_than(cutoff).await.unwrap();
        assert_eq!(removed, 1);

        let turns = repo.history(&sid, None).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user_message, "recent");
    }

    #[tokio::test]
    async fn test_empty_context_persists_as_null() {
        let repo = SqliteConversationRepository::new(test_pool().await);
        let sid = Uuid::new_v4();

        let mut turn = make_turn(sid, "q", "a");
        turn.context = Some(TurnContext::default());
        repo.append(&turn).await.unwrap();

        let turns = repo.history(&sid, None).await.unwrap();
        assert!(turns[0].context.is_none());
    }
}
