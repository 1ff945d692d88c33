//! Portfolio statistics for the dashboard

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::ledger::money;

/// Dashboard figures
#[derive(Debug, Serialize, PartialEq)]
pub struct DashboardStats {
    pub total_persons: i64,
    pub active_persons: i64,
    pub total_loans: i64,
    pub active_loans: i64,
    pub completed_loans: i64,
    pub cancelled_loans: i64,
    pub overdue_loans: i64,
    pub total_lent: Decimal,
    pub total_collected: Decimal,
    pub total_outstanding: Decimal,
    pub total_payments: i64,
    pub collected_this_month: Decimal,
    /// Collected over lent, in percent
    pub collection_rate: Decimal,
}

/// Collections for one calendar month
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MonthlyCollection {
    pub month: String, // YYYY-MM
    pub total: Decimal,
    pub payments: i64,
}

#[derive(sqlx::FromRow)]
struct LoanFigures {
    total_loans: i64,
    active_loans: i64,
    completed_loans: i64,
    cancelled_loans: i64,
    overdue_loans: i64,
    total_lent: Decimal,
    total_collected: Decimal,
    total_outstanding: Decimal,
}

pub struct AnalyticsService {
    db_pool: PgPool,
}

impl AnalyticsService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, ApiError> {
        let (total_persons, active_persons) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE active) FROM persons",
        )
        .fetch_one(&self.db_pool)
        .await?;

        let loans = sqlx::query_as::<_, LoanFigures>(
            r#"
            SELECT
                COUNT(*) AS total_loans,
                COUNT(*) FILTER (WHERE status = 'activo') AS active_loans,
                COUNT(*) FILTER (WHERE status = 'completado') AS completed_loans,
                COUNT(*) FILTER (WHERE status = 'cancelado') AS cancelled_loans,
                COUNT(*) FILTER (WHERE status = 'vencido') AS overdue_loans,
                COALESCE(SUM(total_amount), 0) AS total_lent,
                COALESCE(SUM(paid_amount), 0) AS total_collected,
                COALESCE(SUM(remaining_amount) FILTER (WHERE status <> 'cancelado'), 0)
                    AS total_outstanding
            FROM loans
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        let (total_payments, collected_this_month) = sqlx::query_as::<_, (i64, Decimal)>(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(amount) FILTER (WHERE paid_at >= date_trunc('month', now())), 0)
            FROM payments
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        Ok(DashboardStats {
            total_persons,
            active_persons,
            total_loans: loans.total_loans,
            active_loans: loans.active_loans,
            completed_loans: loans.completed_loans,
            cancelled_loans: loans.cancelled_loans,
            overdue_loans: loans.overdue_loans,
            collection_rate: collection_rate(loans.total_collected, loans.total_lent),
            total_lent: money::to_cents(loans.total_lent),
            total_collected: money::to_cents(loans.total_collected),
            total_outstanding: money::to_cents(loans.total_outstanding),
            total_payments,
            collected_this_month: money::to_cents(collected_this_month),
        })
    }

    /// Collections for the last `months` calendar months, oldest first
    pub async fn monthly_collections(&self, months: u32) -> Result<Vec<MonthlyCollection>, ApiError> {
        let months = months.clamp(1, 24);

        let rows = sqlx::query_as::<_, (String, Decimal, i64)>(
            r#"
            SELECT to_char(date_trunc('month', paid_at), 'YYYY-MM'), SUM(amount), COUNT(*)
            FROM payments
            WHERE paid_at >= date_trunc('month', now()) - make_interval(months => $1)
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind((months - 1) as i32)
        .fetch_all(&self.db_pool)
        .await?;

        let rows = rows
            .into_iter()
            .map(|(month, total, payments)| MonthlyCollection {
                month,
                total,
                payments,
            })
            .collect();

        Ok(fill_months(rows, Utc::now().date_naive(), months))
    }
}

/// Percentage of `lent` already collected, two decimals.
pub fn collection_rate(collected: Decimal, lent: Decimal) -> Decimal {
    if lent.is_zero() {
        return money::to_cents(Decimal::ZERO);
    }
    money::to_cents(collected / lent * Decimal::ONE_HUNDRED)
}

/// One entry per month ending at `today`'s month, zero where nothing was collected.
pub fn fill_months(rows: Vec<MonthlyCollection>, today: NaiveDate, months: u32) -> Vec<MonthlyCollection> {
    let mut year = today.year();
    let mut month = today.month();
    let mut keys = Vec::with_capacity(months as usize);
    for _ in 0..months {
        keys.push(format!("{:04}-{:02}", year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    keys.reverse();

    keys.into_iter()
        .map(|key| {
            rows.iter()
                .find(|r| r.month == key)
                .cloned()
                .map(|r| MonthlyCollection {
                    total: money::to_cents(r.total),
                    ..r
                })
                .unwrap_or(MonthlyCollection {
                    month: key,
                    total: money::to_cents(Decimal::ZERO),
                    payments: 0,
                })
        })
        .collect()
}
