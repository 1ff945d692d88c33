//! Loan aggregate arithmetic
//!
//! Everything here is a pure function of a loan snapshot and its payments, so
//! the transactional code in [`super::store`] only has to read rows, call into
//! this module and write the result back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::money::{self, COMPONENT_TOLERANCE, MAX_PAYMENT_AMOUNT};
use crate::loan::{Loan, LoanStatus};

/// The loan fields reconciliation reads.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanSnapshot {
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub completed: bool,
    pub installments_paid: i32,
    pub status: LoanStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LoanSnapshot {
    /// Snapshot of a freshly issued loan.
    pub fn new(total_amount: Decimal) -> Self {
        let total_amount = money::to_cents(total_amount);
        Self {
            total_amount,
            paid_amount: money::to_cents(Decimal::ZERO),
            remaining_amount: total_amount,
            completed: false,
            installments_paid: 0,
            status: LoanStatus::Active,
            completed_at: None,
        }
    }

    /// Fold recalculated totals back into the snapshot.
    pub fn with_totals(&self, totals: &LoanTotals) -> Self {
        Self {
            total_amount: self.total_amount,
            paid_amount: totals.paid_amount,
            remaining_amount: totals.remaining_amount,
            completed: totals.completed,
            installments_paid: totals.installments_paid,
            status: totals.status,
            completed_at: totals.completed_at,
        }
    }
}

impl From<&Loan> for LoanSnapshot {
    fn from(loan: &Loan) -> Self {
        Self {
            total_amount: loan.total_amount,
            paid_amount: loan.paid_amount,
            remaining_amount: loan.remaining_amount,
            completed: loan.completed,
            installments_paid: loan.installments_paid,
            status: loan.status,
            completed_at: loan.completed_at,
        }
    }
}

/// Derived loan fields written back in a single update.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanTotals {
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub completed: bool,
    pub installments_paid: i32,
    pub status: LoanStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One payment as seen by the ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentLine {
    pub amount: Decimal,
    pub is_installment: bool,
}

/// Sum and installment count over a loan's payments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentAggregate {
    pub total_paid: Decimal,
    pub installments: i64,
}

impl PaymentAggregate {
    pub fn from_lines(lines: &[PaymentLine]) -> Self {
        Self {
            total_paid: money::sum(lines.iter().map(|l| l.amount)),
            installments: lines.iter().filter(|l| l.is_installment).count() as i64,
        }
    }
}

/// Full recalculation from the complete payment set of a loan.
pub fn recalculate(
    snapshot: &LoanSnapshot,
    aggregate: &PaymentAggregate,
    now: DateTime<Utc>,
) -> LoanTotals {
    let installments = i32::try_from(aggregate.installments).unwrap_or(i32::MAX);
    settle(snapshot, aggregate.total_paid, installments, now)
}

/// Incremental update for a newly created payment.
///
/// Must agree with [`recalculate`] over the payment set that includes `line`.
pub fn apply_payment(snapshot: &LoanSnapshot, line: &PaymentLine, now: DateTime<Utc>) -> LoanTotals {
    let installments = if line.is_installment {
        snapshot.installments_paid.saturating_add(1)
    } else {
        snapshot.installments_paid
    };
    settle(snapshot, snapshot.paid_amount + line.amount, installments, now)
}

fn settle(
    snapshot: &LoanSnapshot,
    paid: Decimal,
    installments_paid: i32,
    now: DateTime<Utc>,
) -> LoanTotals {
    let paid_amount = money::to_cents(paid);
    let remaining_amount = money::clamp_non_negative(snapshot.total_amount - paid_amount);
    let completed = remaining_amount <= Decimal::ZERO;

    let mut status = snapshot.status;
    let mut completed_at = snapshot.completed_at;

    if completed {
        if completed_at.is_none() {
            completed_at = Some(now);
            status = LoanStatus::Completed;
        }
    } else if snapshot.completed {
        // cancelled/overdue loans keep their status; never reclassified here
        completed_at = None;
        if status == LoanStatus::Completed {
            status = LoanStatus::Active;
        }
    }

    LoanTotals {
        paid_amount,
        remaining_amount,
        completed,
        installments_paid,
        status,
        completed_at,
    }
}

/// Guard run inside the creating transaction, against the locked loan row.
pub fn ensure_payment_allowed(
    loan_id: Uuid,
    snapshot: &LoanSnapshot,
    amount: Decimal,
) -> Result<(), LedgerError> {
    if snapshot.completed {
        return Err(LedgerError::AlreadyCompleted(loan_id));
    }
    if amount > snapshot.remaining_amount {
        return Err(LedgerError::PaymentExceedsDebt {
            amount,
            remaining: snapshot.remaining_amount,
        });
    }
    Ok(())
}

/// Normalise a payment amount to cents and check its bounds.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    let amount = money::to_cents(amount);
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("Payment amount must be greater than 0"));
    }
    if amount > MAX_PAYMENT_AMOUNT {
        return Err(LedgerError::validation(format!(
            "Payment amount must not exceed {}",
            MAX_PAYMENT_AMOUNT
        )));
    }
    Ok(amount)
}

/// Capital, interest and late-fee parts of a payment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentComponents {
    pub capital: Option<Decimal>,
    pub interest: Option<Decimal>,
    pub late_fee: Option<Decimal>,
}

impl PaymentComponents {
    pub fn sum(&self) -> Decimal {
        money::sum(
            [self.capital, self.interest, self.late_fee]
                .into_iter()
                .flatten(),
        )
    }
}

/// A nonzero split must add up to the payment amount within one cent.
pub fn validate_components(
    amount: Decimal,
    components: &PaymentComponents,
) -> Result<(), LedgerError> {
    let parts = [components.capital, components.interest, components.late_fee];
    if parts.iter().flatten().any(|p| p.is_sign_negative() && !p.is_zero()) {
        return Err(LedgerError::validation(
            "Payment components must not be negative",
        ));
    }

    let sum = components.sum();
    if sum.is_zero() {
        return Ok(());
    }
    if (sum - amount).abs() > COMPONENT_TOLERANCE {
        return Err(LedgerError::validation(format!(
            "Capital, interest and late fee add up to {} but the payment amount is {}",
            sum, amount
        )));
    }
    Ok(())
}
