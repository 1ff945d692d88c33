//! Loan service layer - Business logic for loan management

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::ledger::{self, money, LedgerError, LoanSnapshot};
use crate::loan::{
    CreateLoanRequest, ListLoansQuery, Loan, LoanDetail, LoanStatus, UpdateLoanRequest,
};
use crate::models::{pagination, PaginatedResponse};
use crate::payment::Payment;
use crate::person::{Person, PersonService};

/// Loan service for managing loan lifecycle
#[derive(Clone)]
pub struct LoanService {
    db_pool: PgPool,
}

impl LoanService {
    /// Create a new loan service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Issue a new loan, registering the borrower first when one is supplied inline
    pub async fn issue_loan(&self, request: CreateLoanRequest) -> Result<Loan, ApiError> {
        let total_amount = loan_total(request.total_amount)?;

        let mut tx = self.db_pool.begin().await?;

        let person_id = match (request.person_id, request.borrower) {
            (Some(person_id), None) => {
                let exists =
                    sqlx::query_scalar::<_, Uuid>("SELECT id FROM persons WHERE id = $1")
                        .bind(person_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                exists.ok_or(ApiError::NotFound("Person not found".to_string()))?
            }
            (None, Some(borrower)) => PersonService::insert(&mut *tx, borrower).await?.id,
            _ => {
                return Err(ApiError::ValidationError(
                    "Provide exactly one of person_id or borrower".to_string(),
                ))
            }
        };

        let opening = LoanSnapshot::new(total_amount);
        let now = Utc::now();

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                person_id, total_amount, interest_rate, loan_type, description,
                due_date, installments, installments_paid, paid_amount,
                remaining_amount, completed, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(person_id)
        .bind(opening.total_amount)
        .bind(request.interest_rate.map(money::to_cents).unwrap_or_default())
        .bind(request.loan_type.unwrap_or_default())
        .bind(request.description)
        .bind(request.due_date)
        .bind(request.installments)
        .bind(opening.installments_paid)
        .bind(opening.paid_amount)
        .bind(opening.remaining_amount)
        .bind(opening.completed)
        .bind(opening.status)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            person_id = %loan.person_id,
            amount = %loan.total_amount,
            "Loan issued"
        );

        Ok(loan)
    }

    /// Get loan by ID
    pub async fn get_loan(&self, id: Uuid) -> Result<Loan, ApiError> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(ApiError::NotFound("Loan not found".to_string()))
    }

    /// Loan with its borrower and payments, newest payment first
    pub async fn get_loan_detail(&self, id: Uuid) -> Result<LoanDetail, ApiError> {
        let loan = self.get_loan(id).await?;

        let person = sqlx::query_as::<_, Person>("SELECT * FROM persons WHERE id = $1")
            .bind(loan.person_id)
            .fetch_one(&self.db_pool)
            .await?;

        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE loan_id = $1 ORDER BY paid_at DESC, created_at DESC",
        )
        .bind(id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(LoanDetail {
            loan,
            person,
            payments,
        })
    }

    /// List loans with filters
    pub async fn list_loans(&self, query: ListLoansQuery) -> Result<PaginatedResponse<Loan>, ApiError> {
        let (page, limit, offset) = pagination(query.page, query.limit);

        let mut query_builder = sqlx::QueryBuilder::new("SELECT * FROM loans WHERE 1=1");
        let mut count_builder = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM loans WHERE 1=1");

        if let Some(person_id) = query.person_id {
            query_builder.push(" AND person_id = ");
            query_builder.push_bind(person_id);
            count_builder.push(" AND person_id = ");
            count_builder.push_bind(person_id);
        }
        if let Some(status) = query.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
            count_builder.push(" AND status = ");
            count_builder.push_bind(status);
        }
        if let Some(loan_type) = query.loan_type {
            query_builder.push(" AND loan_type = ");
            query_builder.push_bind(loan_type);
            count_builder.push(" AND loan_type = ");
            count_builder.push_bind(loan_type);
        }
        if let Some(completed) = query.completed {
            query_builder.push(" AND completed = ");
            query_builder.push_bind(completed);
            count_builder.push(" AND completed = ");
            count_builder.push_bind(completed);
        }

        let sort = query.sort_by.unwrap_or_default();
        let order = query.order.unwrap_or_default();
        query_builder.push(format!(
            " ORDER BY {} {} NULLS LAST, id",
            sort.column(),
            order.as_sql()
        ));
        query_builder.push(" LIMIT ");
        query_builder.push_bind(limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let loans = query_builder
            .build_query_as::<Loan>()
            .fetch_all(&self.db_pool)
            .await?;

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: loans,
            total,
            page,
            limit,
        })
    }

    /// Update user-editable fields; a new total amount re-runs the ledger
    pub async fn update_loan(&self, id: Uuid, request: UpdateLoanRequest) -> Result<Loan, ApiError> {
        let total_amount = request.total_amount.map(loan_total).transpose()?;

        let mut tx = self.db_pool.begin().await?;

        let current = ledger::store::lock_loan(&mut *tx, id).await?;

        if let Some(next) = request.status {
            if !current.status.can_transition_to(next, current.completed) {
                return Err(ApiError::Conflict(format!(
                    "Cannot change loan status from {:?} to {:?}",
                    current.status, next
                )));
            }
        }

        let total_changed = total_amount.is_some_and(|t| t != current.total_amount);

        let mut loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET total_amount = COALESCE($1, total_amount),
                interest_rate = COALESCE($2, interest_rate),
                loan_type = COALESCE($3, loan_type),
                description = COALESCE($4, description),
                due_date = COALESCE($5, due_date),
                installments = COALESCE($6, installments),
                status = COALESCE($7, status),
                updated_at = $8
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(total_amount)
        .bind(request.interest_rate.map(money::to_cents))
        .bind(request.loan_type)
        .bind(request.description)
        .bind(request.due_date)
        .bind(request.installments)
        .bind(request.status)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if total_changed {
            loan = ledger::store::recalculate_totals(&mut *tx, id, Utc::now()).await?;
        }

        tx.commit().await?;

        tracing::info!(loan_id = %id, total_changed, "Loan updated");

        Ok(loan)
    }

    /// Delete a loan together with its payments
    pub async fn delete_loan(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Loan not found".to_string()));
        }

        tracing::info!(loan_id = %id, "Loan deleted");

        Ok(())
    }

    /// Rebuild paid/remaining/completed/status from the loan's payments
    pub async fn recalculate_loan_totals(&self, id: Uuid) -> Result<Loan, LedgerError> {
        let mut tx = self.db_pool.begin().await?;
        let loan = ledger::store::recalculate_totals(&mut *tx, id, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(
            loan_id = %id,
            paid = %loan.paid_amount,
            remaining = %loan.remaining_amount,
            "Loan totals recalculated"
        );

        Ok(loan)
    }

    /// Mark open loans past their due date as overdue
    pub async fn mark_overdue_loans(&self) -> Result<Vec<Uuid>, ApiError> {
        let overdue = sqlx::query_as::<_, (Uuid,)>(
            r#"
            UPDATE loans
            SET status = $1, updated_at = $2
            WHERE status = $3 AND completed = FALSE AND due_date < CURRENT_DATE
            RETURNING id
            "#,
        )
        .bind(LoanStatus::Overdue)
        .bind(Utc::now())
        .bind(LoanStatus::Active)
        .fetch_all(&self.db_pool)
        .await?;

        if !overdue.is_empty() {
            tracing::info!(count = overdue.len(), "Loans marked overdue");
        }

        Ok(overdue.into_iter().map(|(id,)| id).collect())
    }
}

/// A loan total at cent precision; sub-cent inputs that round to zero are rejected.
fn loan_total(amount: Decimal) -> Result<Decimal, ApiError> {
    let total = money::to_cents(amount);
    if total <= Decimal::ZERO {
        return Err(ApiError::ValidationError(
            "Loan total must be at least 0.01".to_string(),
        ));
    }
    if total > money::MAX_LOAN_AMOUNT {
        return Err(ApiError::ValidationError(format!(
            "Loan total must not exceed {}",
            money::MAX_LOAN_AMOUNT
        )));
    }
    Ok(total)
}
