//! Application configuration types for Concierge.
//!
//! [`AppConfig`] represents the top-level `config.toml`. All fields have
//! defaults, so an empty or missing file yields a working configuration.
//! Precedence is applied by the loader in concierge-infra: built-in
//! defaults, then `config.toml`, then environment variable overrides.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Concierge backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// HTTP listener and CORS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to embed the widget. `["*"]` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// LLM provider settings.
///
/// The API key itself never appears in config files; only the name of the
/// environment variable holding it does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Override the provider base URL (proxies, compatible endpoints).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable the API key is read from at startup.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Upper bound on one provider call; elapsing counts as unavailable.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Orchestration settings for the chat path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// How many prior turns of a session are included in a new prompt.
    #[serde(default = "default_history_window")]
    pub history_window: u32,
}

fn default_history_window() -> u32 {
    10
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

/// Per-client throttle on the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// Retention sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Turns older than this many days are purged. Zero disables the
    /// background sweep (the `purge` command still works).
    #[serde(default)]
    pub days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { days: 0 }
    }
}
