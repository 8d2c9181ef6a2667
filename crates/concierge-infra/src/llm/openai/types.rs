//! OpenAI Chat Completions API types.
//!
//! OpenAI-specific request/response structures for HTTP communication with
//! the `/v1/chat/completions` endpoint. These are NOT the generic LLM types
//! from concierge-types -- those are provider-agnostic.

use serde::{Deserialize, Serialize};

/// Request body for the Chat Completions API.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// A single message in a Chat Completions conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Response body for a non-streaming chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub model: String,
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: ChatUsage,
}

/// One completion choice. Only the first is used.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Token usage block in a completion response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Error envelope returned by the API on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

/// The error object inside an error envelope.
///
/// `code` distinguishes billing exhaustion (`insufficient_quota`) from a
/// transient rate limit, which both arrive as HTTP 429.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub code: Option<String>,
}
