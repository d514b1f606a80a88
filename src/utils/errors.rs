//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ErrorResponse) {
        match self {
            AppError::Database(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Database Error".to_string(),
                    message: "An error occurred while accessing the database".to_string(),
                    details: Some(json!({ "sql_error": e.to_string() })),
                    code: "DB_ERROR".to_string(),
                },
            ),
            AppError::Migration(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Migration Error".to_string(),
                    message: "Database schema is not up to date".to_string(),
                    details: Some(json!({ "migration_error": e.to_string() })),
                    code: "MIGRATION_ERROR".to_string(),
                },
            ),
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code: "VALIDATION_ERROR".to_string(),
                },
            ),
            AppError::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Serialization Error".to_string(),
                    message: "A stored record could not be decoded".to_string(),
                    details: Some(json!({ "serde_error": e.to_string() })),
                    code: "SERIALIZATION_ERROR".to_string(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg.clone(),
                    details: None,
                    code: "NOT_FOUND".to_string(),
                },
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Bad Request".to_string(),
                    message: msg.clone(),
                    details: None,
                    code: "BAD_REQUEST".to_string(),
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Configuration Error".to_string(),
                    message: msg.clone(),
                    details: None,
                    code: "CONFIGURATION_ERROR".to_string(),
                },
            ),
            AppError::Timeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse {
                    error: "Timeout".to_string(),
                    message: msg.clone(),
                    details: None,
                    code: "TIMEOUT".to_string(),
                },
            ),
            AppError::Store(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Store Error".to_string(),
                    message: "The record store rejected the operation".to_string(),
                    details: Some(json!({ "store_error": msg })),
                    code: "STORE_ERROR".to_string(),
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: "An unexpected error occurred".to_string(),
                    details: Some(json!({ "internal_error": msg })),
                    code: "INTERNAL_ERROR".to_string(),
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.status_and_body();
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        } else {
            tracing::warn!("⚠️ {}", self);
        }
        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let (status, body) = not_found_error("Alert", "42").status_and_body();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "Alert with id '42' not found");

        let (status, _) = bad_request_error("bad").status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = AppError::Store("insert failed".to_string()).status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "STORE_ERROR");
    }
}
