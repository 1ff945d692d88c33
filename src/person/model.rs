//! Borrower models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::ledger::money;
use crate::loan::Loan;
use crate::models::SortOrder;

/// Person (borrower) model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub surname: Option<String>,
    pub national_id: Option<String>, // unique when present
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to register a person
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePersonRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 100))]
    pub surname: Option<String>,
    #[validate(length(max = 30))]
    pub national_id: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub active: Option<bool>,
}

impl CreatePersonRequest {
    /// Trim text fields and turn blanks into `None`.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            surname: blank_to_none(self.surname),
            national_id: blank_to_none(self.national_id),
            phone: blank_to_none(self.phone),
            email: blank_to_none(self.email),
            notes: blank_to_none(self.notes),
            active: self.active,
        }
    }
}

/// Partial update of a person
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePersonRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub surname: Option<String>,
    #[validate(length(max = 30))]
    pub national_id: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub active: Option<bool>,
}

/// Whitelisted sort columns for the person list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonSortKey {
    Name,
    Surname,
    #[default]
    CreatedAt,
}

impl PersonSortKey {
    pub fn column(&self) -> &'static str {
        match self {
            PersonSortKey::Name => "name",
            PersonSortKey::Surname => "surname",
            PersonSortKey::CreatedAt => "created_at",
        }
    }
}

/// Query for listing persons
#[derive(Debug, Default, Deserialize)]
pub struct PersonFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub sort_by: Option<PersonSortKey>,
    pub order: Option<SortOrder>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Person with their loans
#[derive(Debug, Serialize)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub loans: Vec<Loan>,
    pub open_loans: i64,
    #[serde(serialize_with = "money::serialize_cents")]
    pub total_outstanding: Decimal,
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreatePersonRequest {
        CreatePersonRequest {
            name: "  Ana ".to_string(),
            surname: Some("Gómez".to_string()),
            national_id: Some("   ".to_string()),
            phone: None,
            email: Some("ana@example.com".to_string()),
            notes: None,
            active: None,
        }
    }

    #[test]
    fn test_normalized_blanks() {
        let req = request().normalized();
        assert_eq!(req.name, "Ana");
        assert_eq!(req.national_id, None);
        assert_eq!(req.surname.as_deref(), Some("Gómez"));
    }

    #[test]
    fn test_create_person_validation() {
        assert!(request().validate().is_ok());

        let mut req = request();
        req.name = String::new();
        assert!(req.validate().is_err());

        let mut req = request();
        req.email = Some("not-an-email".to_string());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_sort_key_whitelist() {
        let key: PersonSortKey = serde_json::from_str("\"surname\"").unwrap();
        assert_eq!(key.column(), "surname");
        assert!(serde_json::from_str::<PersonSortKey>("\"national_id; DROP TABLE\"").is_err());
    }
}
