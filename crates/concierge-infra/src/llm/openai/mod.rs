//! OpenAiProvider -- concrete [`LlmProvider`] implementation for the
//! OpenAI Chat Completions API (`/v1/chat/completions`).
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use concierge_core::llm::provider::LlmProvider;
use concierge_types::llm::{CompletionRequest, CompletionResponse, ProviderError, Usage};

use types::{ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// OpenAI chat completion provider.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and is only exposed when
/// constructing the Authorization header. It never appears in Debug
/// output, Display output, or tracing logs.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider.
    ///
    /// The HTTP client carries its own generous timeout; the orchestration
    /// layer applies the user-facing deadline on top of each call.
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://api.openai.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`CompletionRequest`] into the wire request.
    fn to_chat_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

// OpenAiProvider intentionally does NOT derive Debug to prevent accidental
// exposure of internal state alongside the SecretString field.

/// Classify a non-success HTTP status into a [`ProviderError`].
///
/// Both quota exhaustion and transient throttling arrive as 429; the error
/// body's `code` field tells them apart. `Retry-After` (seconds) is carried
/// through when present.
fn classify_failure(
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::InvalidCredentials,
        429 => {
            let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
            let code = parsed
                .as_ref()
                .and_then(|b| b.error.code.as_deref())
                .unwrap_or_default();
            if code == "insufficient_quota" || body.contains("insufficient_quota") {
                let message = parsed
                    .map(|b| b.error.message)
                    .unwrap_or_else(|| "quota exhausted".to_string());
                ProviderError::QuotaExceeded(message)
            } else {
                ProviderError::RateLimited {
                    retry_after_ms: retry_after.map(|secs| secs * 1000),
                }
            }
        }
        _ => ProviderError::Unavailable(format!("HTTP {status}: {body}")),
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = self.to_chat_request(request);
        let url = self.url("/v1/chat/completions");

        let response = self
            .client
            .post(&url)
            .header(
                "authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, retry_after, &error_body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("failed to parse response: {e}")))?;

        let text = completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ProviderError::Unavailable("response had no choices".to_string()))?;

        Ok(CompletionResponse {
            text,
            model_used: completion.model,
            usage: Usage {
                prompt_tokens: completion.usage.prompt_tokens,
                completion_tokens: completion.usage.completion_tokens,
            },
        })
    }
}
