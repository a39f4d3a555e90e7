use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{jwt::JwtKeys, AuthService};
use crate::config::AppConfig;
use crate::db;
use crate::users::{InMemoryUserStore, PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = if config.uses_memory_store() {
            warn!("using in-memory user store; data is lost on exit");
            Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>
        } else {
            let pool = db::connect(&config.database_url).await?;
            info!("connected to postgres");
            Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>
        };

        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            auth: Arc::new(AuthService::new(store, keys)),
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
            },
        });
        Self::from_parts(config, Arc::new(InMemoryUserStore::new()))
    }
}
