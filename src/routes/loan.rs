//! Loan route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", get(list_loans).post(create_loan))
        .route("/api/loans/overdue/sweep", post(sweep_overdue_loans))
        .route(
            "/api/loans/:id",
            get(get_loan).put(update_loan).delete(delete_loan),
        )
        .route("/api/loans/:id/recalculate", post(recalculate_loan))
        .route("/api/loans/:id/payments", get(list_loan_payments))
}
