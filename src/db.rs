use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::config::DbConfig;

/// Upper bound on waiting for a pooled connection, including opening a new one.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

pub fn connect_options(cfg: &DbConfig) -> PgConnectOptions {
    // PgConnectOptions::new() already picks up PG* variables and libpq defaults
    let mut opts = PgConnectOptions::new();
    if let Some(host) = &cfg.host {
        opts = opts.host(host);
    }
    if let Some(port) = cfg.port {
        opts = opts.port(port);
    }
    if let Some(name) = &cfg.name {
        opts = opts.database(name);
    }
    if let Some(user) = &cfg.user {
        opts = opts.username(user);
    }
    if let Some(password) = &cfg.password {
        opts = opts.password(password);
    }
    opts
}

/// Builds the shared pool. No connection is opened until the first checkout.
pub fn lazy_pool(cfg: &DbConfig, acquire_timeout: Duration) -> PgPool {
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_lazy_with(connect_options(cfg))
}
