//! Route definitions for the Loanbook API

mod analytics;
mod loan;
mod payment;
mod person;

pub use analytics::analytics_routes;
pub use loan::loan_routes;
pub use payment::payment_routes;
pub use person::person_routes;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers::{health_check, root};
use crate::middleware::{self, RateLimiter};
use crate::state::AppState;

/// Full application router with middleware applied
pub fn app_router(state: AppState, config: &Config, rate_limiter: RateLimiter) -> Router {
    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(person_routes())
        .merge(loan_routes())
        .merge(payment_routes())
        .merge(analytics_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers));

    if config.environment.is_production() {
        app = app.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    app.layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit,
        ))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default();

    if allowed_origins.trim().is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
