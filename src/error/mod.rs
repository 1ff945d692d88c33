//! Centralized API error handling for Loanbook
//!
//! This module provides a unified error type for API responses with proper
//! HTTP status code mapping and JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Loan already completed: {0}")]
    LoanAlreadyCompleted(String),

    #[error("Payment exceeds debt: {0}")]
    PaymentExceedsDebt(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::LoanAlreadyCompleted(_) => "LOAN_ALREADY_COMPLETED",
            ApiError::PaymentExceedsDebt(_) => "PAYMENT_EXCEEDS_DEBT",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::LoanAlreadyCompleted(_) => StatusCode::CONFLICT,
            ApiError::PaymentExceedsDebt(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log server errors
        match &self {
            ApiError::DatabaseError(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Conflict(db.message().to_string())
            }
            _ => ApiError::DatabaseError(err.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::LoanNotFound(_) | LedgerError::PaymentNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            LedgerError::AlreadyCompleted(_) => ApiError::LoanAlreadyCompleted(err.to_string()),
            LedgerError::PaymentExceedsDebt { .. } => ApiError::PaymentExceedsDebt(err.to_string()),
            LedgerError::Validation(message) => ApiError::ValidationError(message),
            LedgerError::Database(db) => ApiError::from(db),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            ApiError::BadRequest("test".to_string()).error_code(),
            "BAD_REQUEST"
        );
        assert_eq!(
            ApiError::PaymentExceedsDebt("test".to_string()).error_code(),
            "PAYMENT_EXCEEDS_DEBT"
        );
        assert_eq!(ApiError::TooManyRequests.error_code(), "TOO_MANY_REQUESTS");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::LoanAlreadyCompleted("test".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::PaymentExceedsDebt("test".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::DatabaseError("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_ledger_error_mapping() {
        let id = Uuid::new_v4();

        let err = ApiError::from(LedgerError::LoanNotFound(id));
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(err.to_string().contains(&id.to_string()));

        let err = ApiError::from(LedgerError::PaymentNotFound(id));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from(LedgerError::AlreadyCompleted(id));
        assert_eq!(err.error_code(), "LOAN_ALREADY_COMPLETED");

        let err = ApiError::from(LedgerError::PaymentExceedsDebt {
            amount: Decimal::new(60001, 2),
            remaining: Decimal::new(60000, 2),
        });
        assert_eq!(err.error_code(), "PAYMENT_EXCEEDS_DEBT");
        assert!(err.to_string().contains("600.01"));

        let err = ApiError::from(LedgerError::validation("components do not add up"));
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(LedgerError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
