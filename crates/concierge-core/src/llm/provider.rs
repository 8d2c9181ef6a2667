//! LlmProvider trait definition.
//!
//! The seam between the orchestration core and the external language-model
//! provider. Uses native async fn in traits (RPITIT, Rust 2024 edition);
//! implementations live in concierge-infra (e.g., `OpenAiProvider`), and
//! tests substitute deterministic fakes.

use concierge_types::llm::{CompletionRequest, CompletionResponse, ProviderError};

/// Trait for language-model provider backends.
///
/// `generate` performs one non-streaming completion and normalizes every
/// failure into a classified [`ProviderError`]. No retries happen at this
/// layer; the orchestration core decides what each error kind means.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn generate(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, ProviderError>> + Send;
}
