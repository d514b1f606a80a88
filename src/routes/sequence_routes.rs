use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::models::{SequenceAnalysis, SystemSequenceReport};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_sequence_router() -> Router<AppState> {
    Router::new()
        .route("/api/sequence/issues", get(system_wide_issues))
        .route("/api/sequence/vehicles/:id", get(vehicle_sequence))
}

async fn system_wide_issues(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SystemSequenceReport>>, AppError> {
    let report = state.sequences.system_wide_issues().await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn vehicle_sequence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SequenceAnalysis>>, AppError> {
    let analysis = state.sequences.analyze_vehicle(id).await?;
    Ok(Json(ApiResponse::success(analysis)))
}
