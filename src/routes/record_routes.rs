use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::models::Alert;
use crate::services::RecalculationSummary;
use crate::state::AppState;
use crate::utils::errors::AppError;

// Escaneos incrementales y recálculo tras editar un registro
pub fn create_record_router() -> Router<AppState> {
    Router::new()
        .route("/api/trips/:id/scan", post(scan_trip))
        .route("/api/trips/:id/recalculate", post(recalculate_trip))
        .route("/api/maintenance/:id/scan", post(scan_maintenance_task))
}

async fn scan_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Alert>>>, AppError> {
    let alerts = state.scans.scan_trip(id).await?;
    Ok(Json(ApiResponse::success(alerts)))
}

async fn scan_maintenance_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Alert>>>, AppError> {
    let alerts = state.scans.scan_maintenance_task(id).await?;
    Ok(Json(ApiResponse::success(alerts)))
}

async fn recalculate_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RecalculationSummary>>, AppError> {
    let summary = state.mileage.recalculate_from_trip(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}
