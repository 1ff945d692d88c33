//! Person API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{ApiResponse, PaginatedResponse};
use crate::person::{
    CreatePersonRequest, Person, PersonDetail, PersonFilter, PersonService, UpdatePersonRequest,
};

pub async fn create_person(
    State(service): State<Arc<PersonService>>,
    Json(request): Json<CreatePersonRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Person>>), ApiError> {
    request.validate()?;
    let person = service.create_person(request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(person))))
}

pub async fn get_person(
    State(service): State<Arc<PersonService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PersonDetail>>, ApiError> {
    let person = service.get_person_detail(id).await?;

    Ok(Json(ApiResponse::ok(person)))
}

pub async fn list_persons(
    State(service): State<Arc<PersonService>>,
    Query(filter): Query<PersonFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<Person>>>, ApiError> {
    let result = service.list_persons(filter).await?;

    Ok(Json(ApiResponse::ok(result)))
}

pub async fn update_person(
    State(service): State<Arc<PersonService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePersonRequest>,
) -> Result<Json<ApiResponse<Person>>, ApiError> {
    request.validate()?;
    let person = service.update_person(id, request).await?;

    Ok(Json(ApiResponse::ok(person)))
}

pub async fn delete_person(
    State(service): State<Arc<PersonService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    service.delete_person(id).await?;

    Ok(Json(ApiResponse::ok(())))
}
