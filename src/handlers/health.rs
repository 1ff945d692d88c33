//! Liveness and database health

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::db::Database;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

pub async fn root() -> &'static str {
    "Loanbook API Server"
}

/// Health check endpoint
pub async fn health_check(State(db): State<Database>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, database) = match db.health().await {
        Ok(()) => (StatusCode::OK, "healthy", "connected".to_string()),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", e.to_string()),
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
