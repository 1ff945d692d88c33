//! Transaction-scoped reads and writes for loan reconciliation
//!
//! All functions take the connection of an open transaction. The loan row is
//! locked with `FOR UPDATE` before any balance is read, so two mutations on
//! the same loan serialize on that row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use super::error::LedgerError;
use super::totals::{self, LoanSnapshot, LoanTotals, PaymentAggregate};
use crate::loan::Loan;

/// Read and lock a loan row for the rest of the transaction.
pub async fn lock_loan(conn: &mut PgConnection, loan_id: Uuid) -> Result<Loan, LedgerError> {
    sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
        .bind(loan_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(LedgerError::LoanNotFound(loan_id))
}

/// Sum and installment count over every payment of a loan.
pub async fn aggregate_payments(
    conn: &mut PgConnection,
    loan_id: Uuid,
) -> Result<PaymentAggregate, LedgerError> {
    let (total_paid, installments) = sqlx::query_as::<_, (Decimal, i64)>(
        r#"
        SELECT COALESCE(SUM(amount), 0), COUNT(*) FILTER (WHERE is_installment)
        FROM payments
        WHERE loan_id = $1
        "#,
    )
    .bind(loan_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(PaymentAggregate {
        total_paid,
        installments,
    })
}

/// Persist derived fields in one statement.
pub async fn write_totals(
    conn: &mut PgConnection,
    loan_id: Uuid,
    totals: &LoanTotals,
) -> Result<Loan, LedgerError> {
    let loan = sqlx::query_as::<_, Loan>(
        r#"
        UPDATE loans
        SET paid_amount = $1,
            remaining_amount = $2,
            completed = $3,
            installments_paid = $4,
            status = $5,
            completed_at = $6,
            updated_at = $7
        WHERE id = $8
        RETURNING *
        "#,
    )
    .bind(totals.paid_amount)
    .bind(totals.remaining_amount)
    .bind(totals.completed)
    .bind(totals.installments_paid)
    .bind(totals.status)
    .bind(totals.completed_at)
    .bind(Utc::now())
    .bind(loan_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(LedgerError::LoanNotFound(loan_id))?;

    Ok(loan)
}

/// Full ledger recalculation for one loan.
pub async fn recalculate_totals(
    conn: &mut PgConnection,
    loan_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Loan, LedgerError> {
    let loan = lock_loan(conn, loan_id).await?;
    let aggregate = aggregate_payments(conn, loan_id).await?;
    let totals = totals::recalculate(&LoanSnapshot::from(&loan), &aggregate, now);

    tracing::debug!(
        loan_id = %loan_id,
        paid = %totals.paid_amount,
        remaining = %totals.remaining_amount,
        completed = totals.completed,
        "Recalculated loan totals"
    );

    write_totals(conn, loan_id, &totals).await
}
