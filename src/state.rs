use crate::config::AppConfig;
use crate::db;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::lazy_pool(&config.db, db::CONNECT_TIMEOUT);
        Ok(Self { db, config })
    }

    #[cfg(test)]
    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// State whose pool points at a closed port, so every checkout fails
    /// quickly without a database being present.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(|_| None)
    }

    #[cfg(test)]
    pub fn fake_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::from_lookup(lookup).expect("test config");
        config.db.host = Some("127.0.0.1".into());
        config.db.port = Some(1);
        config.db.user = Some("postgres".into());
        config.db.password = Some("postgres".into());

        let db = db::lazy_pool(&config.db, std::time::Duration::from_millis(300));
        Self {
            db,
            config: Arc::new(config),
        }
    }
}
