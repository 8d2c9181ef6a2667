//! LLM request/response types for Concierge.
//!
//! These model the data shapes for provider interactions: chat messages,
//! completion requests, usage accounting, and the classified provider
//! error taxonomy the orchestration core branches on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to an LLM provider for a completion.
///
/// System instructions travel inline as `system`-role messages (the
/// OpenAI chat-completions convention), so there is no separate field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Token usage reported by the provider for one completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Response from an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    /// Model that actually served the request, as reported by the provider.
    pub model_used: String,
    pub usage: Usage,
}

/// Classified failures from a provider call.
///
/// The orchestration core treats these differently: `QuotaExceeded` and
/// `RateLimited` surface to the caller as HTTP errors, `Unavailable` is
/// downgraded to the canned fallback reply, and `InvalidCredentials` is a
/// runtime failure distinct from missing configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("provider rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider rejected credentials")]
    InvalidCredentials,

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
