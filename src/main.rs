//! Loanbook Backend Server
//!
//! HTTP API for people, the loans issued to them and the payments made
//! against those loans.

use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;

use loanbook_server::config::Config;
use loanbook_server::db;
use loanbook_server::middleware::RateLimiter;
use loanbook_server::routes::app_router;
use loanbook_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting Loanbook server");

    let pool = db::create_pool(&config).await?;

    if config.run_migrations {
        db::run_migrations(&pool).await?;
    }

    let app_state = AppState::new(pool);

    if config.overdue_sweep_on_startup {
        match app_state.loan_service.mark_overdue_loans().await {
            Ok(ids) => tracing::info!(marked = ids.len(), "Startup overdue sweep finished"),
            Err(e) => tracing::error!(error = %e, "Startup overdue sweep failed"),
        }
    }

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);
    let cleanup = rate_limiter.spawn_cleanup(Duration::from_secs(300));

    let db = app_state.db.clone();
    let app = app_router(app_state, &config, rate_limiter);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    cleanup.abort();
    db.close().await;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
