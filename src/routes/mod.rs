//! Rutas HTTP
//!
//! Capa fina de axum sobre los puntos de entrada del motor.

pub mod alert_routes;
pub mod performance_routes;
pub mod record_routes;
pub mod sequence_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_middleware_with_origins;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_middleware_with_origins(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .merge(alert_routes::create_alert_router())
        .merge(record_routes::create_record_router())
        .merge(sequence_routes::create_sequence_router())
        .merge(performance_routes::create_performance_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "fleet-integrity",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
