//! Loan models for Loanbook

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::ledger::money;
use crate::models::validation::{positive_loan_amount, valid_interest_rate};
use crate::models::SortOrder;
use crate::payment::Payment;
use crate::person::{CreatePersonRequest, Person};

/// Loan status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status")]
pub enum LoanStatus {
    #[serde(rename = "activo")]
    #[sqlx(rename = "activo")]
    Active,
    #[serde(rename = "completado")]
    #[sqlx(rename = "completado")]
    Completed,
    #[serde(rename = "cancelado")]
    #[sqlx(rename = "cancelado")]
    Cancelled,
    #[serde(rename = "vencido")]
    #[sqlx(rename = "vencido")]
    Overdue,
}

impl LoanStatus {
    /// Whether a user edit may move a loan into `next`.
    ///
    /// `completado` is owned by the ledger: it is never assigned by hand and a
    /// completed loan only leaves it when its payments change.
    pub fn can_transition_to(&self, next: LoanStatus, completed: bool) -> bool {
        if *self == next {
            return true;
        }
        if completed || next == LoanStatus::Completed {
            return false;
        }
        matches!(
            next,
            LoanStatus::Active | LoanStatus::Cancelled | LoanStatus::Overdue
        )
    }
}

/// Loan type enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "loan_type")]
pub enum LoanType {
    #[default]
    #[serde(rename = "personal")]
    #[sqlx(rename = "personal")]
    Personal,
    #[serde(rename = "comercial")]
    #[sqlx(rename = "comercial")]
    Commercial,
    #[serde(rename = "emergencia")]
    #[sqlx(rename = "emergencia")]
    Emergency,
    #[serde(rename = "otro")]
    #[sqlx(rename = "otro")]
    Other,
}

/// Loan model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Loan {
    pub id: Uuid,
    pub person_id: Uuid,
    #[serde(serialize_with = "money::serialize_cents")]
    pub total_amount: Decimal,
    #[serde(serialize_with = "money::serialize_cents")]
    pub interest_rate: Decimal, // annual, percent
    pub loan_type: LoanType,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub installments: Option<i32>,
    pub installments_paid: i32,
    #[serde(serialize_with = "money::serialize_cents")]
    pub paid_amount: Decimal,
    #[serde(serialize_with = "money::serialize_cents")]
    pub remaining_amount: Decimal,
    pub completed: bool,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Request to issue a loan, either to a known person or to a new borrower
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanRequest {
    pub person_id: Option<Uuid>,
    #[validate]
    pub borrower: Option<CreatePersonRequest>,
    #[validate(custom = "positive_loan_amount")]
    pub total_amount: Decimal,
    #[validate(custom = "valid_interest_rate")]
    pub interest_rate: Option<Decimal>,
    pub loan_type: Option<LoanType>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 1, max = 600))]
    pub installments: Option<i32>,
}

/// Partial update of the user-editable loan fields
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLoanRequest {
    #[validate(custom = "positive_loan_amount")]
    pub total_amount: Option<Decimal>,
    #[validate(custom = "valid_interest_rate")]
    pub interest_rate: Option<Decimal>,
    pub loan_type: Option<LoanType>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 1, max = 600))]
    pub installments: Option<i32>,
    pub status: Option<LoanStatus>,
}

/// Whitelisted sort columns for the loan list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanSortKey {
    #[default]
    CreatedAt,
    DueDate,
    TotalAmount,
    RemainingAmount,
    Status,
}

impl LoanSortKey {
    pub fn column(&self) -> &'static str {
        match self {
            LoanSortKey::CreatedAt => "created_at",
            LoanSortKey::DueDate => "due_date",
            LoanSortKey::TotalAmount => "total_amount",
            LoanSortKey::RemainingAmount => "remaining_amount",
            LoanSortKey::Status => "status",
        }
    }
}

/// Query for listing loans
#[derive(Debug, Default, Deserialize)]
pub struct ListLoansQuery {
    pub person_id: Option<Uuid>,
    pub status: Option<LoanStatus>,
    pub loan_type: Option<LoanType>,
    pub completed: Option<bool>,
    pub sort_by: Option<LoanSortKey>,
    pub order: Option<SortOrder>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Loan with its borrower and payment history
#[derive(Debug, Serialize)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: Loan,
    pub person: Person,
    pub payments: Vec<Payment>,
}
