use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::dto::{ApiResponse, DateRangeQuery};
use crate::models::{Insight, PerformanceMetrics};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_performance_router() -> Router<AppState> {
    Router::new()
        .route("/api/drivers/performance", get(driver_performance))
        .route("/api/drivers/insights", get(driver_insights))
}

async fn driver_performance(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<Vec<PerformanceMetrics>>>, AppError> {
    let metrics = state.performance.driver_performance(query.into()).await?;
    Ok(Json(ApiResponse::success(metrics)))
}

async fn driver_insights(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<Vec<Insight>>>, AppError> {
    let insights = state.performance.driver_insights(query.into()).await?;
    Ok(Json(ApiResponse::success(insights)))
}
