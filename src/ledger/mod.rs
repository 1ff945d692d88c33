//! Loan ledger reconciliation
//!
//! Keeps a loan's paid amount, remaining amount, completed flag and status in
//! step with the payments recorded against it.

pub mod error;
pub mod money;
pub mod store;
pub mod totals;

pub use error::LedgerError;
pub use totals::{
    apply_payment, ensure_payment_allowed, recalculate, validate_amount, validate_components,
    LoanSnapshot, LoanTotals, PaymentAggregate, PaymentComponents, PaymentLine,
};
