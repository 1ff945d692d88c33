//! Payment API handlers

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
use crate::payment::{
    CreatePaymentRequest, ListPaymentsQuery, Payment, PaymentReceipt, PaymentService,
    UpdatePaymentRequest,
};

/// Record a payment; responds with the payment and the updated loan
pub async fn create_payment(
    State(service): State<Arc<PaymentService>>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentReceipt>>), ApiError> {
    request.validate()?;
    let receipt = service.create_payment(request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(receipt))))
}

pub async fn get_payment(
    State(service): State<Arc<PaymentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    let payment = service.get_payment(id).await?;

    Ok(Json(ApiResponse::ok(payment)))
}

pub async fn list_payments(
    State(service): State<Arc<PaymentService>>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Payment>>>, ApiError> {
    let payments = service.list_payments(query).await?;

    Ok(Json(ApiResponse::ok(payments)))
}

pub async fn update_payment(
    State(service): State<Arc<PaymentService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    request.validate()?;
    let payment = service.update_payment(id, request).await?;

    Ok(Json(ApiResponse::ok(payment)))
}

pub async fn delete_payment(
    State(service): State<Arc<PaymentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    service.delete_payment(id).await?;

    Ok(Json(ApiResponse::ok(())))
}
