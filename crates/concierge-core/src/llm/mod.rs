//! LLM provider abstraction for Concierge.
//!
//! Defines the `LlmProvider` trait that concrete provider clients in
//! concierge-infra implement, and the canned fallback reply substituted
//! when a provider call fails in an unclassified way.

pub mod provider;

/// Fixed reply substituted when the provider is unavailable.
///
/// Returned as a normal success with `model = "fallback"` and zero token
/// usage so the user-visible conversation is never interrupted.
pub const FALLBACK_REPLY: &str = "I'm sorry, I wasn't able to process your \
request right now. Please try again in a moment or contact our support team.";

/// Model name recorded on turns answered by the canned fallback.
pub const FALLBACK_MODEL: &str = "fallback";
