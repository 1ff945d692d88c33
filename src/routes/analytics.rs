//! Statistics route definitions

use axum::{routing::get, Router};

use crate::handlers::analytics::{get_dashboard, get_monthly_collections};
use crate::state::AppState;

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats/dashboard", get(get_dashboard))
        .route("/api/stats/collections", get(get_monthly_collections))
}
