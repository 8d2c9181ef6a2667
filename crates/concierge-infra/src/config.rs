//! Configuration loader for Concierge.
//!
//! Reads `config.toml` from the data directory (`~/.concierge/` in
//! production) and deserializes it into [`AppConfig`]. Falls back to
//! defaults when the file is missing or malformed, then applies
//! environment variable overrides on top.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use concierge_types::config::AppConfig;

/// Resolve the data directory: `CONCIERGE_DATA_DIR` or `~/.concierge`.
pub fn data_dir() -> PathBuf {
    match std::env::var("CONCIERGE_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".concierge")
        }
    }
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Environment overrides (`CONCIERGE_HOST`, `CONCIERGE_PORT`,
///   `CONCIERGE_MODEL`, `CONCIERGE_PROVIDER_BASE_URL`) are applied last.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let mut config = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => match toml::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    "Failed to parse {}: {err}, using defaults",
                    config_path.display()
                );
                AppConfig::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    };

    apply_env_overrides(&mut config);
    config
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(host) = std::env::var("CONCIERGE_HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("CONCIERGE_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("CONCIERGE_PORT is not a valid port, ignoring"),
        }
    }
    if let Ok(model) = std::env::var("CONCIERGE_MODEL") {
        config.provider.model = model;
    }
    if let Ok(base_url) = std::env::var("CONCIERGE_PROVIDER_BASE_URL") {
        config.provider.base_url = Some(base_url);
    }
}

/// Read the provider API key from the environment variable the config
/// names. Fails fast at startup rather than on the first chat request.
pub fn load_api_key(config: &AppConfig) -> anyhow::Result<SecretString> {
    let var = &config.provider.api_key_env;
    let key = std::env::var(var)
        .map_err(|_| anyhow::anyhow!("provider API key not set: export {var} and restart"))?;
    if key.trim().is_empty() {
        anyhow::bail!("provider API key in {var} is empty");
    }
    Ok(SecretString::from(key))
}
