//! Conversation turn types for Concierge.
//!
//! A [`Turn`] is the unit of persistence: one user message and the reply
//! generated for it, with provider metadata and optional feedback. Sessions
//! have no storage record of their own — a session exists once it has at
//! least one persisted turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Maximum length of a user message, in characters.
pub const MAX_USER_MESSAGE_CHARS: usize = 1000;

/// Maximum length of a persisted reply, in characters.
pub const MAX_AI_RESPONSE_CHARS: usize = 2000;

/// Maximum length of feedback text, in characters.
pub const MAX_FEEDBACK_CHARS: usize = 500;

/// Descriptive tag attached to an outgoing reply.
///
/// Drives client-side presentation only (icon, confidence badge). Tags
/// never influence how a request is handled.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (reply_kind IN ('greeting', 'faq', 'rag', 'bot', 'error'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Greeting,
    Faq,
    Rag,
    Bot,
    Error,
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyKind::Greeting => write!(f, "greeting"),
            ReplyKind::Faq => write!(f, "faq"),
            ReplyKind::Rag => write!(f, "rag"),
            ReplyKind::Bot => write!(f, "bot"),
            ReplyKind::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ReplyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "greeting" => Ok(ReplyKind::Greeting),
            "faq" => Ok(ReplyKind::Faq),
            "rag" => Ok(ReplyKind::Rag),
            "bot" => Ok(ReplyKind::Bot),
            "error" => Ok(ReplyKind::Error),
            other => Err(format!("invalid reply kind: '{other}'")),
        }
    }
}

/// Token counts for one provider exchange.
///
/// Invariant: `total == prompt + completion`. All three are zero when the
/// reply came from the canned fallback rather than the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u32,
    pub completion: u32,
    pub total: u32,
}

impl TokenUsage {
    /// Usage from prompt/completion counts, with the total derived.
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }
}

/// Opaque client context attached to a chat request.
///
/// The well-known fields come from the embeddable widget; anything else the
/// embedder sends is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TurnContext {
    /// Whether no context fields were supplied at all.
    pub fn is_empty(&self) -> bool {
        self.page.is_none()
            && self.user_agent.is_none()
            && self.referrer.is_none()
            && self.extra.is_empty()
    }
}

/// One persisted user/assistant exchange.
///
/// Immutable after creation except for `rating` and `feedback_text`, which
/// a later feedback call may set on the most recent turn of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
    pub client_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TurnContext>,
    pub model_name: String,
    pub usage: TokenUsage,
    pub reply_kind: ReplyKind,
    /// User rating in [1, 5], absent until feedback is attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Free-text feedback, at most [`MAX_FEEDBACK_CHARS`] characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
}
