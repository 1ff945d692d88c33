//! Errors raised by payment mutations and loan reconciliation

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Ledger error taxonomy.
///
/// Every variant aborts the surrounding transaction; nothing is retried.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Loan not found: {0}")]
    LoanNotFound(Uuid),

    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("Loan {0} is already fully paid")]
    AlreadyCompleted(Uuid),

    #[error("Payment of {amount} exceeds the remaining debt of {remaining}")]
    PaymentExceedsDebt { amount: Decimal, remaining: Decimal },

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }
}
