use std::num::NonZeroU32;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Connection settings for PostgreSQL. Unset fields fall back to the libpq
/// defaults (`PGHOST`, `PGUSER`, ...) that sqlx applies on its own.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DbConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub frontend_url: String,
    pub host: String,
    pub port: u16,
    pub db: DbConfig,
    pub expose_error_details: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = DbConfig {
            host: lookup("DB_HOST"),
            port: lookup("DB_PORT")
                .map(|v| v.parse::<u16>().context("DB_PORT must be a port number"))
                .transpose()?,
            name: lookup("DB_NAME"),
            user: lookup("DB_USER"),
            password: lookup("DB_PASSWORD"),
            max_connections: lookup("DB_MAX_CONNECTIONS")
                .map(|v| {
                    v.parse::<NonZeroU32>()
                        .context("DB_MAX_CONNECTIONS must be a positive integer")
                })
                .transpose()?
                .map_or(10, NonZeroU32::get),
        };

        let port = lookup("PORT")
            .map(|v| v.parse::<u16>().context("PORT must be a port number"))
            .transpose()?
            .unwrap_or(5000);

        let expose_error_details = lookup("EXPOSE_ERROR_DETAILS")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            frontend_url: lookup("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.into()),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db,
            expose_error_details,
        })
    }
}
