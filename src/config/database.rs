//! Configuración de base de datos
//!
//! Este módulo maneja la configuración del pool de PostgreSQL con SQLx.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::env;
use std::time::Duration;

use crate::utils::errors::AppError;

/// Configuración de la base de datos
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
        }
    }

    /// Lee `DATABASE_URL` y, opcionalmente, `DATABASE_MAX_CONNECTIONS`
    pub fn from_env() -> Result<Self, AppError> {
        let url = env::var("DATABASE_URL").map_err(|_| {
            AppError::Configuration("DATABASE_URL must be set in environment variables".to_string())
        })?;
        let mut config = Self::new(url);

        if let Ok(raw) = env::var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = raw.trim().parse().map_err(|_| {
                AppError::Configuration(format!("DATABASE_MAX_CONNECTIONS inválido: '{}'", raw))
            })?;
            config.min_connections = config.min_connections.min(config.max_connections);
        }
        Ok(config)
    }

    /// Crear un nuevo pool de conexiones
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .connect(&self.url)
            .await
    }
}
