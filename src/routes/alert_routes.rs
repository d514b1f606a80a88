use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::{AlertActionRequest, ApiResponse};
use crate::models::{Alert, AlertFilters};
use crate::services::{cancellation_channel, ScanSummary};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_alert_router() -> Router<AppState> {
    Router::new()
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/scan", post(run_scan))
        .route("/api/alerts/:id/action", post(process_action))
}

async fn run_scan(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ScanSummary>>, AppError> {
    // En su propia tarea: si el cliente se desconecta el escaneo termina igual
    let scans = state.scans.clone();
    let summary = tokio::spawn(async move {
        let (_tx, rx) = cancellation_channel();
        scans.run_scan(&rx).await
    })
    .await
    .map_err(|e| AppError::Internal(format!("scan task failed: {}", e)))?;

    let message = format!("{} alertas creadas", summary.alerts_created);
    Ok(Json(ApiResponse::success_with_message(summary, message)))
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(filters): Query<AlertFilters>,
) -> Result<Json<ApiResponse<Vec<Alert>>>, AppError> {
    let alerts = state.alerts.list_alerts(&filters).await?;
    Ok(Json(ApiResponse::success(alerts)))
}

async fn process_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AlertActionRequest>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    request.validate()?;
    let alert = state
        .alerts
        .process_alert_action(id, request.action, request.reason(), request.duration)
        .await?;
    Ok(Json(ApiResponse::success(alert)))
}
