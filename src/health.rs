//! Liveness probe for orchestrators. Touches nothing but the HTTP stack.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::{error::method_not_allowed, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health).fallback(method_not_allowed))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}
