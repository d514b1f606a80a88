//! Fleet Integrity & Anomaly Detection Engine
//!
//! Validación de secuencias de números de serie de viajes, detección de
//! anomalías en viajes y mantenimiento con ciclo de vida de alertas, y
//! métricas e insights de rendimiento de conductores.

pub mod cache;
pub mod config;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
