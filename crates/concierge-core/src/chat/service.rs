//! Chat service orchestrating one request end to end.
//!
//! ChatService resolves the session, fetches the history window, composes
//! the prompt, calls the provider under a bounded timeout, classifies the
//! reply, and persists the turn best-effort. It is generic over
//! `ConversationRepository` and `LlmProvider` so tests can substitute a
//! deterministic fake for either side.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use concierge_types::config::AppConfig;
use concierge_types::error::{ChatError, FeedbackError, RepositoryError};
use concierge_types::llm::{CompletionRequest, ProviderError};
use concierge_types::turn::{
    ReplyKind, TokenUsage, Turn, TurnContext, MAX_AI_RESPONSE_CHARS, MAX_FEEDBACK_CHARS,
    MAX_USER_MESSAGE_CHARS,
};

use crate::chat::classify::{classify, is_greeting, ReplyOrigin};
use crate::chat::repository::ConversationRepository;
use crate::chat::{history, prompt, session};
use crate::llm::provider::LlmProvider;
use crate::llm::{FALLBACK_MODEL, FALLBACK_REPLY};

/// Orchestration settings distilled from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub history_window: u32,
    pub provider_timeout: Duration,
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            max_tokens: config.provider.max_tokens,
            temperature: config.provider.temperature,
            history_window: config.chat.history_window,
            provider_timeout: Duration::from_secs(config.provider.timeout_secs),
        }
    }
}

/// The reply returned to the HTTP layer after one orchestration pass.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub session_id: Uuid,
    pub text: String,
    pub kind: ReplyKind,
    pub confidence: Option<f64>,
    pub model: String,
    pub usage: TokenUsage,
    pub created_at: DateTime<Utc>,
}

/// Orchestrates the chat, history, and feedback paths.
pub struct ChatService<R: ConversationRepository, P: LlmProvider> {
    repo: R,
    provider: P,
    settings: ChatSettings,
}

impl<R: ConversationRepository, P: LlmProvider> ChatService<R, P> {
    pub fn new(repo: R, provider: P, settings: ChatSettings) -> Self {
        Self {
            repo,
            provider,
            settings,
        }
    }

    /// Handle one inbound chat message.
    ///
    /// Validation and classified provider failures (quota, rate limit,
    /// bad credentials) are terminal. An unavailable provider -- including
    /// a call that outlives the configured timeout -- degrades to the
    /// canned fallback reply, returned as a normal success. Either way a
    /// turn is persisted, best-effort, so the audit trail stays complete.
    pub async fn handle_message(
        &self,
        candidate_session: Option<&str>,
        message: &str,
        context: Option<TurnContext>,
        client_address: &str,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::Validation("message cannot be empty".to_string()));
        }
        if message.chars().count() > MAX_USER_MESSAGE_CHARS {
            return Err(ChatError::Validation(format!(
                "message too long (max {MAX_USER_MESSAGE_CHARS} characters)"
            )));
        }

        let session_id = session::resolve_session(candidate_session)?;

        let window = history::fetch_window(&self.repo, &session_id, self.settings.history_window).await;
        let messages = prompt::compose(&window, context.as_ref(), message);

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
        };

        let outcome =
            tokio::time::timeout(self.settings.provider_timeout, self.provider.generate(&request))
                .await;

        let (text, model, usage, classification) = match outcome {
            Ok(Ok(response)) => {
                let origin = if is_greeting(message) {
                    ReplyOrigin::Greeting
                } else {
                    ReplyOrigin::Provider
                };
                let confidence = match origin {
                    ReplyOrigin::Greeting => Some(0.9),
                    _ => None,
                };
                let usage =
                    TokenUsage::new(response.usage.prompt_tokens, response.usage.completion_tokens);
                (
                    response.text,
                    response.model_used,
                    usage,
                    classify(origin, confidence),
                )
            }
            Ok(Err(e @ ProviderError::QuotaExceeded(_))) => {
                warn!(session_id = %session_id, error = %e, "provider quota exhausted");
                return Err(ChatError::ProviderQuotaExceeded);
            }
            Ok(Err(e @ ProviderError::RateLimited { .. })) => {
                warn!(session_id = %session_id, error = %e, "provider rate limited");
                return Err(ChatError::ProviderRateLimited);
            }
            Ok(Err(e @ ProviderError::InvalidCredentials)) => {
                warn!(session_id = %session_id, "provider rejected credentials");
                return Err(ChatError::Provider(e));
            }
            Ok(Err(e @ ProviderError::Unavailable(_))) => {
                warn!(session_id = %session_id, error = %e, "provider unavailable, substituting fallback reply");
                (
                    FALLBACK_REPLY.to_string(),
                    FALLBACK_MODEL.to_string(),
                    TokenUsage::default(),
                    classify(ReplyOrigin::Fallback, None),
                )
            }
            Err(_elapsed) => {
                warn!(
                    session_id = %session_id,
                    timeout_secs = self.settings.provider_timeout.as_secs(),
                    "provider call timed out, substituting fallback reply"
                );
                (
                    FALLBACK_REPLY.to_string(),
                    FALLBACK_MODEL.to_string(),
                    TokenUsage::default(),
                    classify(ReplyOrigin::Fallback, None),
                )
            }
        };

        let turn = Turn {
            id: Uuid::now_v7(),
            session_id,
            user_message: message.to_string(),
            ai_response: truncate_chars(&text, MAX_AI_RESPONSE_CHARS),
            created_at: Utc::now(),
            client_address: client_address.to_string(),
            context,
            model_name: model.clone(),
            usage,
            reply_kind: classification.kind,
            rating: None,
            feedback_text: None,
        };

        // Persistence is best-effort: the reply is already computed and is
        // delivered even if the store is down.
        if let Err(e) = self.repo.append(&turn).await {
            warn!(session_id = %session_id, error = %e, "failed to persist turn");
        } else {
            info!(
                session_id = %session_id,
                kind = %classification.kind,
                model = %model,
                "turn persisted"
            );
        }

        Ok(ChatReply {
            session_id,
            text,
            kind: classification.kind,
            confidence: classification.confidence,
            model,
            usage,
            created_at: turn.created_at,
        })
    }

    /// Full ordered history of a session (read path).
    pub async fn session_history(&self, session_id: &Uuid) -> Result<Vec<Turn>, RepositoryError> {
        self.repo.history(session_id, None).await
    }

    /// Attach rating and optional feedback text to the most recent turn.
    pub async fn attach_feedback(
        &self,
        session_id: &Uuid,
        rating: u8,
        feedback_text: Option<String>,
    ) -> Result<Turn, FeedbackError> {
        if !(1..=5).contains(&rating) {
            return Err(FeedbackError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        if let Some(text) = &feedback_text {
            if text.chars().count() > MAX_FEEDBACK_CHARS {
                return Err(FeedbackError::Validation(format!(
                    "feedback too long (max {MAX_FEEDBACK_CHARS} characters)"
                )));
            }
        }

        match self.repo.attach_feedback(session_id, rating, feedback_text).await {
            Ok(turn) => Ok(turn),
            Err(RepositoryError::NotFound) => Err(FeedbackError::SessionNotFound),
            Err(e) => Err(FeedbackError::Storage(e.to_string())),
        }
    }

    /// Delete turns older than `days`. Returns how many were removed.
    pub async fn purge_older_than(&self, days: u32) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        let removed = self.repo.purge_older_than(cutoff).await?;
        if removed > 0 {
            info!(removed, days, "retention purge complete");
        }
        Ok(removed)
    }
}

/// Truncate to at most `max` characters, on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use concierge_types::llm::{CompletionResponse, Usage};

    /// In-memory repository recording appended turns in arrival order.
    #[derive(Default)]
    struct FakeRepo {
        turns: Mutex<Vec<Turn>>,
        fail_append: bool,
    }

    impl ConversationRepository for FakeRepo {
        async fn append(&self, turn: &Turn) -> Result<Uuid, RepositoryError> {
            if self.fail_append {
                return Err(RepositoryError::Connection);
            }
            self.turns.lock().unwrap().push(turn.clone());
            Ok(turn.id)
        }

        async fn history(
            &self,
            session_id: &Uuid,
            _limit: Option<i64>,
        ) -> Result<Vec<Turn>, RepositoryError> {
            Ok(self
                .turns
                .lock()
                .unwrap()
                .iter()
                .filter(|t| &t.session_id == session_id)
                .cloned()
                .collect())
        }

        async fn latest_window(
            &self,
            session_id: &Uuid,
            window: u32,
        ) -> Result<Vec<Turn>, RepositoryError> {
            let all = self.history(session_id, None).await?;
            let skip = all.len().saturating_sub(window as usize);
            Ok(all[skip..].to_vec())
        }

        async fn attach_feedback(
            &self,
            session_id: &Uuid,
            rating: u8,
            feedback_text: Option<String>,
        ) -> Result<Turn, RepositoryError> {
            let mut turns = self.turns.lock().unwrap();
            let latest = turns
                .iter_mut()
                .filter(|t| &t.session_id == session_id)
                .max_by_key(|t| t.created_at)
                .ok_or(RepositoryError::NotFound)?;
            latest.rating = Some(rating);
            latest.feedback_text = feedback_text;
            Ok(latest.clone())
        }

        async fn purge_older_than(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<u64, RepositoryError> {
            let mut turns = self.turns.lock().unwrap();
            let before = turns.len();
            turns.retain(|t| t.created_at >= cutoff);
            Ok((before - turns.len()) as u64)
        }
    }

    /// Deterministic provider scripted per test.
    struct FakeProvider {
        behavior: Behavior,
        calls: AtomicU32,
    }

    enum Behavior {
        Reply(String),
        Fail(fn() -> ProviderError),
        Hang,
    }

    impl FakeProvider {
        fn replying(text: &str) -> Self {
            Self {
                behavior: Behavior::Reply(text.to_string()),
                calls: AtomicU32::new(0),
            }
        }

        fn failing(f: fn() -> ProviderError) -> Self {
            Self {
                behavior: Behavior::Fail(f),
                calls: AtomicU32::new(0),
            }
        }

        fn hanging() -> Self {
            Self {
                behavior: Behavior::Hang,
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LlmProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn generate(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Reply(text) => Ok(CompletionResponse {
                    text: text.clone(),
                    model_used: "gpt-4o-mini".to_string(),
                    usage: Usage {
                        prompt_tokens: 42,
                        completion_tokens: 17,
                    },
                }),
                Behavior::Fail(f) => Err(f()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("hang provider should be timed out");
                }
            }
        }
    }

    fn settings() -> ChatSettings {
        ChatSettings {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 256,
            temperature: 0.7,
            history_window: 10,
            provider_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_first_message_on_fresh_session() {
        let service = ChatService::new(FakeRepo::default(), FakeProvider::replying("Hello! How can I help?"), settings());

        let reply = service
            .handle_message(None, "Hi", None, "203.0.113.9")
            .await
            .unwrap();

        assert_eq!(reply.text, "Hello! How can I help?");
        assert_eq!(reply.kind, ReplyKind::Greeting);
        assert_eq!(reply.usage.total, 59);
        assert_eq!(reply.session_id.get_version(), Some(uuid::Version::Random));

        let turns = service.session_history(&reply.session_id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user_message, "Hi");
        assert_eq!(turns[0].ai_response, "Hello! How can I help?");
    }

    #[tokio::test]
    async fn test_empty_and_oversized_messages_rejected_before_provider() {
        let provider = FakeProvider::replying("unused");
        let service = ChatService::new(FakeRepo::default(), provider, settings());

        let err = service.handle_message(None, "   ", None, "").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let long = "x".repeat(MAX_USER_MESSAGE_CHARS + 1);
        let err = service.handle_message(None, &long, None, "").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        assert_eq!(service.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_session_id_rejected() {
        let service = ChatService::new(FakeRepo::default(), FakeProvider::replying("x"), settings());
        let err = service
            .handle_message(Some("not-a-uuid"), "Hello?", None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidSessionId(_)));
    }

    #[tokio::test]
    async fn test_quota_exceeded_surfaces_without_fabricated_reply() {
        let service = ChatService::new(
            FakeRepo::default(),
            FakeProvider::failing(|| ProviderError::QuotaExceeded("hard limit".to_string())),
            settings(),
        );
        let err = service
            .handle_message(None, "Question", None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ProviderQuotaExceeded));
        // Nothing persisted for a surfaced provider failure.
        assert!(service.repo.turns.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_rate_limit_surfaces() {
        let service = ChatService::new(
            FakeRepo::default(),
            FakeProvider::failing(|| ProviderError::RateLimited { retry_after_ms: None }),
            settings(),
        );
        let err = service
            .handle_message(None, "Question", None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ProviderRateLimited));
    }

    #[tokio::test]
    async fn test_unavailable_degrades_to_fallback_and_persists_error_turn() {
        let service = ChatService::new(
            FakeRepo::default(),
            FakeProvider::failing(|| ProviderError::Unavailable("connection refused".to_string())),
            settings(),
        );

        let reply = service
            .handle_message(None, "What plans do you offer?", None, "")
            .await
            .unwrap();

        assert_eq!(reply.text, FALLBACK_REPLY);
        assert_eq!(reply.model, FALLBACK_MODEL);
        assert_eq!(reply.kind, ReplyKind::Error);
        assert_eq!(reply.usage, TokenUsage::default());

        let turns = service.repo.turns.lock().unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].reply_kind, ReplyKind::Error);
        assert_eq!(turns[0].usage.total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_into_fallback() {
        let service = ChatService::new(FakeRepo::default(), FakeProvider::hanging(), settings());

        let reply = service
            .handle_message(None, "Anyone there?", None, "")
            .await
            .unwrap();

        assert_eq!(reply.model, FALLBACK_MODEL);
        assert_eq!(reply.kind, ReplyKind::Error);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_block_reply() {
        let repo = FakeRepo {
            fail_append: true,
            ..Default::default()
        };
        let service = ChatService::new(repo, FakeProvider::replying("Sure thing."), settings());

        let reply = service
            .handle_message(None, "Can you help?", None, "")
            .await
            .unwrap();
        assert_eq!(reply.text, "Sure thing.");
    }

    #[tokio::test]
    async fn test_history_round_trips_persisted_text() {
        let service = ChatService::new(FakeRepo::default(), FakeProvider::replying("Answer A"), settings());
        let sid = Uuid::new_v4().to_string();

        service
            .handle_message(Some(&sid), "Question A?", None, "")
            .await
            .unwrap();

        let turns = service
            .session_history(&sid.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(turns[0].user_message, "Question A?");
        assert_eq!(turns[0].ai_response, "Answer A");
    }

    #[tokio::test]
    async fn test_oversized_reply_truncated_on_persist() {
        let long_reply = "y".repeat(MAX_AI_RESPONSE_CHARS + 500);
        let service = ChatService::new(FakeRepo::default(), FakeProvider::replying(&long_reply), settings());

        let reply = service.handle_message(None, "Tell me everything", None, "").await.unwrap();
        // The caller still gets the full text; only the stored copy is bounded.
        assert_eq!(reply.text.chars().count(), MAX_AI_RESPONSE_CHARS + 500);

        let turns = service.repo.turns.lock().unwrap();
        assert_eq!(turns[0].ai_response.chars().count(), MAX_AI_RESPONSE_CHARS);
    }

    #[tokio::test]
    async fn test_feedback_targets_latest_turn_only() {
        let service = ChatService::new(FakeRepo::default(), FakeProvider::replying("reply"), settings());
        let sid = Uuid::new_v4();
        let sid_str = sid.to_string();

        service.handle_message(Some(&sid_str), "first", None, "").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        service.handle_message(Some(&sid_str), "second", None, "").await.unwrap();

        let updated = service
            .attach_feedback(&sid, 5, Some("great".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.user_message, "second");
        assert_eq!(updated.rating, Some(5));

        let turns = service.session_history(&sid).await.unwrap();
        assert_eq!(turns[0].rating, None);
        assert_eq!(turns[0].feedback_text, None);
        assert_eq!(turns[1].rating, Some(5));
    }

    #[tokio::test]
    async fn test_feedback_validation_and_not_found() {
        let service = ChatService::new(FakeRepo::default(), FakeProvider::replying("x"), settings());
        let sid = Uuid::new_v4();

        let err = service.attach_feedback(&sid, 0, None).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Validation(_)));

        let err = service.attach_feedback(&sid, 6, None).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Validation(_)));

        let long = "z".repeat(MAX_FEEDBACK_CHARS + 1);
        let err = service.attach_feedback(&sid, 3, Some(long)).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Validation(_)));

        let err = service.attach_feedback(&sid, 3, None).await.unwrap_err();
        assert!(matches!(err, FeedbackError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_purge_removes_old_turns() {
        let repo = FakeRepo::default();
        let sid = Uuid::new_v4();
        let mut old = Turn {
            id: Uuid::now_v7(),
            session_id: sid,
            user_message: "old".to_string(),
            ai_response: "old reply".to_string(),
            created_at: Utc::now() - chrono::Duration::days(120),
            client_address: String::new(),
            context: None,
            model_name: "gpt-4o-mini".to_string(),
            usage: TokenUsage::default(),
            reply_kind: ReplyKind::Bot,
            rating: None,
            feedback_text: None,
        };
        repo.turns.lock().unwrap().push(old.clone());
        old.id = Uuid::now_v7();
        old.created_at = Utc::now();
        old.user_message = "recent".to_string();
        repo.turns.lock().unwrap().push(old);

        let service = ChatService::new(repo, FakeProvider::replying("x"), settings());
        let removed = service.purge_older_than(90).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = service.session_history(&sid).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_message, "recent");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 3), "hél");
        assert_eq!(truncate_chars("ok", 10), "ok");
    }
}
