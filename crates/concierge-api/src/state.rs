//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both the CLI
//! commands and the REST API handlers. The services are generic over
//! repository/provider traits, but AppState pins them to the concrete
//! infra implementations.

use std::sync::Arc;

use secrecy::SecretString;

use concierge_core::chat::service::{ChatService, ChatSettings};
use concierge_core::ratelimit::RateLimiter;
use concierge_infra::config::{data_dir, load_api_key, load_config};
use concierge_infra::llm::OpenAiProvider;
use concierge_infra::sqlite::pool::DatabasePool;
use concierge_infra::sqlite::turn::SqliteConversationRepository;
use concierge_types::config::AppConfig;

/// Concrete type alias for the service generics pinned to infra implementations.
pub type ConcreteChatService = ChatService<SqliteConversationRepository, OpenAiProvider>;

/// Shared application state for CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<AppConfig>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, read the provider credential, and wire services.
    ///
    /// A missing or empty API key fails here, at startup, rather than on
    /// the first chat request.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let api_key = load_api_key(&config)?;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("concierge.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        Self::wire(config, api_key, db_pool)
    }

    /// Wire services from already-resolved inputs.
    pub fn wire(
        config: AppConfig,
        api_key: SecretString,
        db_pool: DatabasePool,
    ) -> anyhow::Result<Self> {
        let repo = SqliteConversationRepository::new(db_pool.clone());

        let mut provider = OpenAiProvider::new(api_key);
        if let Some(base_url) = &config.provider.base_url {
            provider = provider.with_base_url(base_url.clone());
        }

        let settings = ChatSettings::from_config(&config);
        let chat_service = ChatService::new(repo, provider, settings);
        let limiter = RateLimiter::from_config(&config.rate_limit);

        Ok(Self {
            chat_service: Arc::new(chat_service),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
            db_pool,
        })
    }
}
