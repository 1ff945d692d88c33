use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::loan::Loan;
use crate::models::{pagination, PaginatedResponse};
use crate::person::model::{
    blank_to_none, CreatePersonRequest, Person, PersonDetail, PersonFilter, UpdatePersonRequest,
};

#[derive(Clone)]
pub struct PersonService {
    db_pool: PgPool,
}

impl PersonService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_person(&self, request: CreatePersonRequest) -> Result<Person, ApiError> {
        let mut conn = self.db_pool.acquire().await?;
        let person = Self::insert(&mut *conn, request).await?;

        tracing::info!(person_id = %person.id, "Person registered");

        Ok(person)
    }

    /// Insert on an existing connection so loan issuing can share its transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        request: CreatePersonRequest,
    ) -> Result<Person, ApiError> {
        let request = request.normalized();
        if request.name.is_empty() {
            return Err(ApiError::ValidationError("Name is required".to_string()));
        }

        let now = Utc::now();
        let person = sqlx::query_as::<_, Person>(
            r#"
            INSERT INTO persons (
                name, surname, national_id, phone, email, notes,
                active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.surname)
        .bind(&request.national_id)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(&request.notes)
        .bind(request.active.unwrap_or(true))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| national_id_conflict(e, request.national_id.as_deref()))?;

        Ok(person)
    }

    pub async fn get_person(&self, id: Uuid) -> Result<Person, ApiError> {
        sqlx::query_as::<_, Person>("SELECT * FROM persons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(ApiError::NotFound("Person not found".to_string()))
    }

    pub async fn get_person_detail(&self, id: Uuid) -> Result<PersonDetail, ApiError> {
        let person = self.get_person(id).await?;

        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE person_id = $1 ORDER BY created_at DESC",
        )
        .bind(id)
        .fetch_all(&self.db_pool)
        .await?;

        let open_loans = loans.iter().filter(|l| !l.completed).count() as i64;
        let total_outstanding = self.outstanding_balance(id).await?;

        Ok(PersonDetail {
            open_loans,
            total_outstanding,
            person,
            loans,
        })
    }

    pub async fn list_persons(
        &self,
        filter: PersonFilter,
    ) -> Result<PaginatedResponse<Person>, ApiError> {
        let (page, limit, offset) = pagination(filter.page, filter.limit);

        let mut query_builder = sqlx::QueryBuilder::new("SELECT * FROM persons WHERE 1=1");
        let mut count_builder = sqlx::QueryBuilder::new("SELECT COUNT(*) FROM persons WHERE 1=1");

        if let Some(search) = blank_to_none(filter.search) {
            let pattern = format!("%{}%", search);
            for builder in [&mut query_builder, &mut count_builder] {
                builder.push(" AND (name ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" OR surname ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" OR national_id ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(")");
            }
        }

        if let Some(active) = filter.active {
            query_builder.push(" AND active = ");
            query_builder.push_bind(active);
            count_builder.push(" AND active = ");
            count_builder.push_bind(active);
        }

        let sort = filter.sort_by.unwrap_or_default();
        let order = filter.order.unwrap_or_default();
        query_builder.push(format!(" ORDER BY {} {}", sort.column(), order.as_sql()));
        query_builder.push(" LIMIT ");
        query_builder.push_bind(limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let persons = query_builder
            .build_query_as::<Person>()
            .fetch_all(&self.db_pool)
            .await?;

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: persons,
            total,
            page,
            limit,
        })
    }

    pub async fn update_person(
        &self,
        id: Uuid,
        request: UpdatePersonRequest,
    ) -> Result<Person, ApiError> {
        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let national_id = blank_to_none(request.national_id);

        let person = sqlx::query_as::<_, Person>(
            r#"
            UPDATE persons
            SET name = COALESCE($1, name),
                surname = COALESCE($2, surname),
                national_id = COALESCE($3, national_id),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                notes = COALESCE($6, notes),
                active = COALESCE($7, active),
                updated_at = $8
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(blank_to_none(request.surname))
        .bind(&national_id)
        .bind(blank_to_none(request.phone))
        .bind(blank_to_none(request.email))
        .bind(blank_to_none(request.notes))
        .bind(request.active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| national_id_conflict(e, national_id.as_deref()))?
        .ok_or(ApiError::NotFound("Person not found".to_string()))?;

        Ok(person)
    }

    /// Delete a person and their settled loans.
    ///
    /// Refused while any of their loans is still open.
    pub async fn delete_person(&self, id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM persons WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(ApiError::NotFound("Person not found".to_string()));
        }

        let open_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE person_id = $1 AND completed = FALSE",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open_loans > 0 {
            return Err(ApiError::Conflict(format!(
                "Person has {} open loan(s) and cannot be deleted",
                open_loans
            )));
        }

        sqlx::query("DELETE FROM persons WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(person_id = %id, "Person deleted");

        Ok(())
    }

    /// Sum of remaining balances over a person's open loans.
    pub async fn outstanding_balance(&self, id: Uuid) -> Result<Decimal, ApiError> {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(remaining_amount), 0)
            FROM loans
            WHERE person_id = $1 AND completed = FALSE AND status <> 'cancelado'
            "#,
        )
        .bind(id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(total)
    }
}

fn national_id_conflict(err: sqlx::Error, national_id: Option<&str>) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::Conflict(format!(
            "A person with national ID '{}' already exists",
            national_id.unwrap_or_default()
        )),
        _ => ApiError::from(err),
    }
}
