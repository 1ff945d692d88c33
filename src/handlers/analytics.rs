//! Statistics handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::services::{AnalyticsService, DashboardStats, MonthlyCollection};

#[derive(Debug, Deserialize)]
pub struct CollectionsQuery {
    pub months: Option<u32>,
}

pub async fn get_dashboard(
    State(service): State<Arc<AnalyticsService>>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = service.dashboard().await?;

    Ok(Json(ApiResponse::ok(stats)))
}

pub async fn get_monthly_collections(
    State(service): State<Arc<AnalyticsService>>,
    Query(query): Query<CollectionsQuery>,
) -> Result<Json<ApiResponse<Vec<MonthlyCollection>>>, ApiError> {
    let months = query.months.unwrap_or(6);
    if !(1..=24).contains(&months) {
        return Err(ApiError::ValidationError(
            "months must be between 1 and 24".to_string(),
        ));
    }

    let collections = service.monthly_collections(months).await?;

    Ok(Json(ApiResponse::ok(collections)))
}
