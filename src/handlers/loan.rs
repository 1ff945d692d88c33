//! Loan API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::loan::{CreateLoanRequest, ListLoansQuery, Loan, LoanDetail, LoanService, UpdateLoanRequest};
use crate::models::{ApiResponse, PaginatedResponse};
use crate::payment::{Payment, PaymentService};

/// Issue a new loan
pub async fn create_loan(
    State(service): State<Arc<LoanService>>,
    Json(request): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Loan>>), ApiError> {
    request.validate()?;
    let loan = service.issue_loan(request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(loan))))
}

/// Get a single loan with its borrower and payments
pub async fn get_loan(
    State(service): State<Arc<LoanService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanDetail>>, ApiError> {
    let loan = service.get_loan_detail(id).await?;

    Ok(Json(ApiResponse::ok(loan)))
}

/// Get list of loans
pub async fn list_loans(
    State(service): State<Arc<LoanService>>,
    Query(query): Query<ListLoansQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Loan>>>, ApiError> {
    let loans = service.list_loans(query).await?;

    Ok(Json(ApiResponse::ok(loans)))
}

pub async fn update_loan(
    State(service): State<Arc<LoanService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLoanRequest>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    request.validate()?;
    let loan = service.update_loan(id, request).await?;

    Ok(Json(ApiResponse::ok(loan)))
}

pub async fn delete_loan(
    State(service): State<Arc<LoanService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    service.delete_loan(id).await?;

    Ok(Json(ApiResponse::ok(())))
}

/// Rebuild a loan's totals from its payments
pub async fn recalculate_loan(
    State(service): State<Arc<LoanService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let loan = service.recalculate_loan_totals(id).await?;

    Ok(Json(ApiResponse::ok(loan)))
}

pub async fn list_loan_payments(
    State(service): State<Arc<PaymentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Payment>>>, ApiError> {
    let payments = service.list_loan_payments(id).await?;

    Ok(Json(ApiResponse::ok(payments)))
}

#[derive(Debug, Serialize)]
pub struct OverdueSweep {
    pub marked: usize,
    pub loan_ids: Vec<Uuid>,
}

/// Flag active loans past their due date as overdue
pub async fn sweep_overdue_loans(
    State(service): State<Arc<LoanService>>,
) -> Result<Json<ApiResponse<OverdueSweep>>, ApiError> {
    let loan_ids = service.mark_overdue_loans().await?;

    Ok(Json(ApiResponse::ok(OverdueSweep {
        marked: loan_ids.len(),
        loan_ids,
    })))
}
