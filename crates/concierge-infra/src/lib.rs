//! Infrastructure implementations for Concierge.
//!
//! Concrete adapters behind the core traits: SQLite persistence, the
//! OpenAI-compatible provider HTTP client, and configuration loading.

pub mod config;
pub mod llm;
pub mod sqlite;
