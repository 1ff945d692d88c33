//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::db::Database;
use crate::loan::LoanService;
use crate::payment::PaymentService;
use crate::person::PersonService;
use crate::services::AnalyticsService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub person_service: Arc<PersonService>,
    pub loan_service: Arc<LoanService>,
    pub payment_service: Arc<PaymentService>,
    pub analytics_service: Arc<AnalyticsService>,
}

impl AppState {
    /// Build every service on top of one injected pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            person_service: Arc::new(PersonService::new(pool.clone())),
            loan_service: Arc::new(LoanService::new(pool.clone())),
            payment_service: Arc::new(PaymentService::new(pool.clone())),
            analytics_service: Arc::new(AnalyticsService::new(pool.clone())),
            db: Database::new(pool),
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db.clone()
    }
}

impl FromRef<AppState> for Arc<PersonService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.person_service.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payment_service.clone()
    }
}

impl FromRef<AppState> for Arc<AnalyticsService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.analytics_service.clone()
    }
}
