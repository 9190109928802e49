use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{error::method_not_allowed, state::AppState, users::repo::User};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users).fallback(method_not_allowed))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Response {
    match User::list_all(&state.db).await {
        Ok(users) => {
            debug!(count = users.len(), "users listed");
            Json(users).into_response()
        }
        Err(e) => e.into_response_with(state.config.expose_error_details),
    }
}

/// These run against a live PostgreSQL when `TEST_DATABASE_URL` is set and
/// are skipped otherwise. Each test works in a throwaway schema.
#[cfg(test)]
mod pg_tests {
    use std::{sync::Arc, time::Duration};

    use axum::{body::Body, http::Request, http::StatusCode};
    use sqlx::{
        postgres::{PgConnectOptions, PgPoolOptions},
        PgPool,
    };
    use tower::ServiceExt;

    use crate::{app::build_app, config::AppConfig, db::CONNECT_TIMEOUT, state::AppState};

    struct Scratch {
        admin: PgPool,
        pool: PgPool,
        schema: String,
    }

    impl Scratch {
        async fn setup() -> Option<Self> {
            let url = std::env::var("TEST_DATABASE_URL").ok()?;
            let opts: PgConnectOptions = url.parse().expect("TEST_DATABASE_URL");
            let schema = format!("users_api_test_{}", uuid::Uuid::new_v4().simple());

            let admin = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(opts.clone())
                .await
                .expect("connect admin pool");
            sqlx::query(&format!(r#"CREATE SCHEMA "{schema}""#))
                .execute(&admin)
                .await
                .expect("create schema");
            sqlx::query(&format!(
                r#"
                CREATE TABLE "{schema}".users (
                    user_id    SERIAL PRIMARY KEY,
                    username   TEXT NOT NULL,
                    email      TEXT NOT NULL,
                    is_active  BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at TIMESTAMP NOT NULL DEFAULT now(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )
                "#
            ))
            .execute(&admin)
            .await
            .expect("create users table");

            let pool = PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(CONNECT_TIMEOUT)
                .connect_lazy_with(opts.options([("search_path", schema.as_str())]));

            Some(Self { admin, pool, schema })
        }

        fn app(&self) -> axum::Router {
            let config = AppConfig::from_lookup(|_| None).expect("default config");
            build_app(AppState::from_parts(self.pool.clone(), Arc::new(config))).expect("app")
        }

        async fn insert(&self, username: &str, active: bool) {
            sqlx::query(&format!(
                r#"INSERT INTO "{}".users (username, email, is_active) VALUES ($1, $2, $3)"#,
                self.schema
            ))
            .bind(username)
            .bind(format!("{username}@example.com"))
            .bind(active)
            .execute(&self.admin)
            .await
            .expect("insert user");
        }

        /// Usernames in the order a plain scan of the table returns them.
        async fn usernames_in_table_order(&self) -> Vec<String> {
            sqlx::query_scalar::<_, String>(&format!(
                r#"SELECT username FROM "{}".users"#,
                self.schema
            ))
            .fetch_all(&self.admin)
            .await
            .expect("select usernames")
        }

        async fn teardown(self) {
            self.pool.close().await;
            sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
                .execute(&self.admin)
                .await
                .expect("drop schema");
        }
    }

    async fn get_users(app: axum::Router) -> (StatusCode, serde_json::Value) {
        let res = app
            .oneshot(Request::get("/api/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    // Returned connections go back to the pool from a spawned task.
    async fn wait_for_idle(pool: &PgPool, expected: usize) -> usize {
        for _ in 0..50 {
            if pool.num_idle() == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        pool.num_idle()
    }

    #[tokio::test]
    async fn empty_table_lists_as_empty_array() {
        let Some(db) = Scratch::setup().await else {
            return;
        };

        let (status, body) = get_users(db.app()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        db.teardown().await;
    }

    #[tokio::test]
    async fn rows_are_listed_with_six_typed_fields() {
        let Some(db) = Scratch::setup().await else {
            return;
        };
        db.insert("ana", true).await;
        db.insert("bo", false).await;
        db.insert("cy", true).await;

        let (status, body) = get_users(db.app()).await;
        assert_eq!(status, StatusCode::OK);

        let rows = body.as_array().expect("array");
        assert_eq!(rows.len(), 3);
        for row in rows {
            let obj = row.as_object().expect("object");
            assert_eq!(obj.len(), 6);
            assert!(obj["user_id"].is_i64());
            assert!(obj["username"].is_string());
            assert!(obj["email"].is_string());
            assert!(obj["is_active"].is_boolean());
            assert!(obj["created_at"].is_string());
            assert!(obj["updated_at"].is_string());
        }
        let listed: Vec<String> = rows
            .iter()
            .map(|r| r["username"].as_str().expect("username").to_string())
            .collect();
        assert_eq!(listed, db.usernames_in_table_order().await);
        assert_eq!(listed, ["ana", "bo", "cy"]);

        db.teardown().await;
    }

    #[tokio::test]
    async fn null_columns_come_back_as_null() {
        let Some(db) = Scratch::setup().await else {
            return;
        };
        sqlx::query(&format!(
            r#"ALTER TABLE "{}".users ALTER COLUMN email DROP NOT NULL"#,
            db.schema
        ))
        .execute(&db.admin)
        .await
        .expect("relax email");
        sqlx::query(&format!(
            r#"INSERT INTO "{}".users (username, email) VALUES ('dee', NULL)"#,
            db.schema
        ))
        .execute(&db.admin)
        .await
        .expect("insert null email");

        let (status, body) = get_users(db.app()).await;
        assert_eq!(status, StatusCode::OK);

        let rows = body.as_array().expect("array");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["username"], "dee");
        assert!(rows[0]["email"].is_null());
        assert_eq!(rows[0].as_object().expect("object").len(), 6);

        db.teardown().await;
    }

    #[tokio::test]
    async fn connections_return_to_pool_after_success_and_failure() {
        let Some(db) = Scratch::setup().await else {
            return;
        };

        // warm one connection so the pool has something to lend
        let (status, _) = get_users(db.app()).await;
        assert_eq!(status, StatusCode::OK);
        let idle_before = wait_for_idle(&db.pool, 1).await;
        assert_eq!(idle_before, 1);

        let (status, _) = get_users(db.app()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wait_for_idle(&db.pool, idle_before).await, idle_before);

        sqlx::query(&format!(r#"DROP TABLE "{}".users"#, db.schema))
            .execute(&db.admin)
            .await
            .expect("drop table");

        let (status, body) = get_users(db.app()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], "database query failed");
        assert_eq!(wait_for_idle(&db.pool, idle_before).await, idle_before);

        db.teardown().await;
    }
}
