//! Payment service layer - payment mutations and their loan reconciliation
//!
//! Every mutation runs in one transaction that locks the owning loan row
//! before reading its balance. Returning early with an error drops the
//! transaction uncommitted, which rolls back the payment and loan writes.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::ledger::{self, LedgerError, LoanSnapshot, PaymentLine};
use crate::models::{pagination, PaginatedResponse};
use crate::payment::{
    CreatePaymentRequest, ListPaymentsQuery, Payment, PaymentReceipt, UpdatePaymentRequest,
};

/// Payment service for recording, editing and removing payments
#[derive(Clone)]
pub struct PaymentService {
    db_pool: PgPool,
}

impl PaymentService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Record a payment and apply it to the loan incrementally
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentReceipt, LedgerError> {
        let amount = ledger::validate_amount(request.amount)?;
        ledger::validate_components(amount, &request.components())?;

        let mut tx = self.db_pool.begin().await?;

        // balance checks must see the locked row, not a pre-transaction read
        let loan = ledger::store::lock_loan(&mut *tx, request.loan_id).await?;
        let snapshot = LoanSnapshot::from(&loan);
        if let Err(e) = ledger::ensure_payment_allowed(loan.id, &snapshot, amount) {
            tracing::warn!(loan_id = %loan.id, amount = %amount, error = %e, "Payment rejected");
            return Err(e);
        }

        let now = Utc::now();
        let is_installment = request.is_installment.unwrap_or(false);

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                loan_id, amount, capital_amount, interest_amount, late_fee_amount,
                method, reference, description, scheduled_date, is_installment,
                installment_number, paid_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(amount)
        .bind(request.capital_amount.map(ledger::money::to_cents))
        .bind(request.interest_amount.map(ledger::money::to_cents))
        .bind(request.late_fee_amount.map(ledger::money::to_cents))
        .bind(request.method.unwrap_or_default())
        .bind(request.reference)
        .bind(request.description)
        .bind(request.scheduled_date)
        .bind(is_installment)
        .bind(request.installment_number.filter(|_| is_installment))
        .bind(request.paid_at.unwrap_or(now))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let totals = ledger::apply_payment(
            &snapshot,
            &PaymentLine {
                amount,
                is_installment,
            },
            now,
        );
        let loan = ledger::store::write_totals(&mut *tx, loan.id, &totals).await?;

        tx.commit().await?;

        tracing::info!(
            payment_id = %payment.id,
            loan_id = %loan.id,
            amount = %payment.amount,
            remaining = %loan.remaining_amount,
            completed = loan.completed,
            "Payment recorded"
        );

        Ok(PaymentReceipt { payment, loan })
    }

    /// Apply partial changes; an amount or installment change re-runs the ledger
    pub async fn update_payment(
        &self,
        id: Uuid,
        request: UpdatePaymentRequest,
    ) -> Result<Payment, LedgerError> {
        let mut tx = self.db_pool.begin().await?;

        let existing = Self::lock_payment(&mut *tx, id).await?;

        let mut merged = request.merge_into(&existing);
        merged.amount = ledger::validate_amount(merged.amount)?;
        ledger::validate_components(merged.amount, &merged.components())?;
        if !merged.is_installment {
            merged.installment_number = None;
        }

        let amount_changed = merged.amount != existing.amount;
        let ledger_changed = amount_changed || merged.is_installment != existing.is_installment;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET amount = $1,
                capital_amount = $2,
                interest_amount = $3,
                late_fee_amount = $4,
                method = $5,
                reference = $6,
                description = $7,
                scheduled_date = $8,
                is_installment = $9,
                installment_number = $10,
                paid_at = $11,
                updated_at = $12
            WHERE id = $13
            RETURNING *
            "#,
        )
        .bind(merged.amount)
        .bind(merged.capital_amount.map(ledger::money::to_cents))
        .bind(merged.interest_amount.map(ledger::money::to_cents))
        .bind(merged.late_fee_amount.map(ledger::money::to_cents))
        .bind(merged.method)
        .bind(&merged.reference)
        .bind(&merged.description)
        .bind(merged.scheduled_date)
        .bind(merged.is_installment)
        .bind(merged.installment_number)
        .bind(merged.paid_at)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if ledger_changed {
            ledger::store::recalculate_totals(&mut *tx, payment.loan_id, Utc::now()).await?;
        }

        tx.commit().await?;

        tracing::info!(
            payment_id = %id,
            loan_id = %payment.loan_id,
            amount_changed,
            "Payment updated"
        );

        Ok(payment)
    }

    /// Remove a payment and rebuild the loan totals from the survivors
    pub async fn delete_payment(&self, id: Uuid) -> Result<(), LedgerError> {
        let mut tx = self.db_pool.begin().await?;

        let payment = Self::lock_payment(&mut *tx, id).await?;

        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let loan = ledger::store::recalculate_totals(&mut *tx, payment.loan_id, Utc::now()).await?;

        tx.commit().await?;

        tracing::info!(
            payment_id = %id,
            loan_id = %loan.id,
            remaining = %loan.remaining_amount,
            "Payment deleted"
        );

        Ok(())
    }

    /// Get payment by ID
    pub async fn get_payment(&self, id: Uuid) -> Result<Payment, LedgerError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(LedgerError::PaymentNotFound(id))
    }

    /// Payments of one loan, newest first
    pub async fn list_loan_payments(&self, loan_id: Uuid) -> Result<Vec<Payment>, LedgerError> {
        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM loans WHERE id = $1")
            .bind(loan_id)
            .fetch_optional(&self.db_pool)
            .await?;
        if exists.is_none() {
            return Err(LedgerError::LoanNotFound(loan_id));
        }

        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE loan_id = $1 ORDER BY paid_at DESC, created_at DESC",
        )
        .bind(loan_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(payments)
    }

    /// List payments with filters
    pub async fn list_payments(
        &self,
        query: ListPaymentsQuery,
    ) -> Result<PaginatedResponse<Payment>, LedgerError> {
        let (page, limit, offset) = pagination(query.page, query.limit);

        let mut query_builder = sqlx::QueryBuilder::new("SELECT * FROM payments WHERE 1=1");
        let mut count_builder = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM payments WHERE 1=1");

        if let Some(loan_id) = query.loan_id {
            query_builder.push(" AND loan_id = ");
            query_builder.push_bind(loan_id);
            count_builder.push(" AND loan_id = ");
            count_builder.push_bind(loan_id);
        }
        if let Some(method) = query.method {
            query_builder.push(" AND method = ");
            query_builder.push_bind(method);
            count_builder.push(" AND method = ");
            count_builder.push_bind(method);
        }
        if let Some(is_installment) = query.is_installment {
            query_builder.push(" AND is_installment = ");
            query_builder.push_bind(is_installment);
            count_builder.push(" AND is_installment = ");
            count_builder.push_bind(is_installment);
        }
        if let Some(from) = query.from {
            query_builder.push(" AND paid_at::date >= ");
            query_builder.push_bind(from);
            count_builder.push(" AND paid_at::date >= ");
            count_builder.push_bind(from);
        }
        if let Some(to) = query.to {
            query_builder.push(" AND paid_at::date <= ");
            query_builder.push_bind(to);
            count_builder.push(" AND paid_at::date <= ");
            count_builder.push_bind(to);
        }

        let sort = query.sort_by.unwrap_or_default();
        let order = query.order.unwrap_or_default();
        query_builder.push(format!(" ORDER BY {} {}, id", sort.column(), order.as_sql()));
        query_builder.push(" LIMIT ");
        query_builder.push_bind(limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let payments = query_builder
            .build_query_as::<Payment>()
            .fetch_all(&self.db_pool)
            .await?;

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: payments,
            total,
            page,
            limit,
        })
    }

    /// Load a payment after locking its loan, keeping the loan-then-payment lock order
    async fn lock_payment(conn: &mut PgConnection, id: Uuid) -> Result<Payment, LedgerError> {
        let loan_id = sqlx::query_scalar::<_, Uuid>("SELECT loan_id FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(LedgerError::PaymentNotFound(id))?;

        ledger::store::lock_loan(conn, loan_id).await?;

        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(LedgerError::PaymentNotFound(id))
    }
}
