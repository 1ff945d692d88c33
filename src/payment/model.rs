//! Payment models and data structures

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::ledger::money;
use crate::ledger::PaymentComponents;
use crate::loan::Loan;
use crate::models::validation::{non_negative_amount, positive_payment_amount};
use crate::models::SortOrder;

/// Payment method
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "efectivo")]
    #[sqlx(rename = "efectivo")]
    Cash,
    #[serde(rename = "transferencia")]
    #[sqlx(rename = "transferencia")]
    Transfer,
    #[serde(rename = "tarjeta")]
    #[sqlx(rename = "tarjeta")]
    Card,
    #[serde(rename = "cheque")]
    #[sqlx(rename = "cheque")]
    Check,
    #[serde(rename = "otro")]
    #[sqlx(rename = "otro")]
    Other,
}

/// Payment model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub loan_id: Uuid,
    #[serde(serialize_with = "money::serialize_cents")]
    pub amount: Decimal,
    #[serde(serialize_with = "money::serialize_cents_opt")]
    pub capital_amount: Option<Decimal>,
    #[serde(serialize_with = "money::serialize_cents_opt")]
    pub interest_amount: Option<Decimal>,
    #[serde(serialize_with = "money::serialize_cents_opt")]
    pub late_fee_amount: Option<Decimal>,
    pub method: PaymentMethod,
    pub reference: Option<String>, // bank/transfer reference
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub is_installment: bool,
    pub installment_number: Option<i32>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn components(&self) -> PaymentComponents {
        PaymentComponents {
            capital: self.capital_amount,
            interest: self.interest_amount,
            late_fee: self.late_fee_amount,
        }
    }
}

/// Request to record a payment against a loan
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub loan_id: Uuid,
    #[validate(custom = "positive_payment_amount")]
    pub amount: Decimal,
    #[validate(custom = "non_negative_amount")]
    pub capital_amount: Option<Decimal>,
    #[validate(custom = "non_negative_amount")]
    pub interest_amount: Option<Decimal>,
    #[validate(custom = "non_negative_amount")]
    pub late_fee_amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub is_installment: Option<bool>,
    #[validate(range(min = 1))]
    pub installment_number: Option<i32>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl CreatePaymentRequest {
    pub fn components(&self) -> PaymentComponents {
        PaymentComponents {
            capital: self.capital_amount,
            interest: self.interest_amount,
            late_fee: self.late_fee_amount,
        }
    }
}

/// Partial change to an existing payment
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePaymentRequest {
    #[validate(custom = "positive_payment_amount")]
    pub amount: Option<Decimal>,
    #[validate(custom = "non_negative_amount")]
    pub capital_amount: Option<Decimal>,
    #[validate(custom = "non_negative_amount")]
    pub interest_amount: Option<Decimal>,
    #[validate(custom = "non_negative_amount")]
    pub late_fee_amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub is_installment: Option<bool>,
    #[validate(range(min = 1))]
    pub installment_number: Option<i32>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl UpdatePaymentRequest {
    /// Overlay the requested changes on an existing payment.
    pub fn merge_into(self, existing: &Payment) -> Payment {
        Payment {
            id: existing.id,
            loan_id: existing.loan_id,
            amount: self.amount.unwrap_or(existing.amount),
            capital_amount: self.capital_amount.or(existing.capital_amount),
            interest_amount: self.interest_amount.or(existing.interest_amount),
            late_fee_amount: self.late_fee_amount.or(existing.late_fee_amount),
            method: self.method.unwrap_or(existing.method),
            reference: self.reference.or_else(|| existing.reference.clone()),
            description: self.description.or_else(|| existing.description.clone()),
            scheduled_date: self.scheduled_date.or(existing.scheduled_date),
            is_installment: self.is_installment.unwrap_or(existing.is_installment),
            installment_number: self.installment_number.or(existing.installment_number),
            paid_at: self.paid_at.unwrap_or(existing.paid_at),
            created_at: existing.created_at,
            updated_at: existing.updated_at,
        }
    }
}

/// Whitelisted sort columns for the payment list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSortKey {
    #[default]
    PaidAt,
    Amount,
    CreatedAt,
    Method,
}

impl PaymentSortKey {
    pub fn column(&self) -> &'static str {
        match self {
            PaymentSortKey::PaidAt => "paid_at",
            PaymentSortKey::Amount => "amount",
            PaymentSortKey::CreatedAt => "created_at",
            PaymentSortKey::Method => "method",
        }
    }
}

/// Query for listing payments
#[derive(Debug, Default, Deserialize)]
pub struct ListPaymentsQuery {
    pub loan_id: Option<Uuid>,
    pub method: Option<PaymentMethod>,
    pub is_installment: Option<bool>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort_by: Option<PaymentSortKey>,
    pub order: Option<SortOrder>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// A created payment together with the loan it settled against
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub loan: Loan,
}
