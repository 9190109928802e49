use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::error::AppError;

/// A row of the externally owned `users` table. The schema belongs to the
/// database, so anything but the key may come back NULL and is passed
/// through as JSON `null`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

// Casts keep decoding stable whether the table uses int4/int8 keys or
// timestamp/timestamptz columns.
const LIST_USERS: &str = r#"
    SELECT
        user_id::int8 AS user_id,
        username,
        email,
        is_active,
        created_at::timestamptz AS created_at,
        updated_at::timestamptz AS updated_at
    FROM users
"#;

impl User {
    /// Checks out one connection, runs the listing query on it and hands the
    /// connection back to the pool before returning, whatever the outcome.
    pub async fn list_all(db: &PgPool) -> Result<Vec<User>, AppError> {
        let mut conn = db.acquire().await.map_err(AppError::Acquire)?;

        let rows = sqlx::query_as::<_, User>(LIST_USERS)
            .fetch_all(&mut *conn)
            .await;

        drop(conn);

        rows.map_err(AppError::Query)
    }
}
