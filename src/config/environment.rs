//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno: servidor, backend del
//! record store, parámetros del escaneo y de la caché de insights.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::InsightCacheConfig;
use crate::services::ScanOptions;
use crate::utils::errors::AppError;

/// Backend del record store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("backend desconocido '{}'", other)),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub scan_trip_limit: i64,
    pub scan_maintenance_limit: i64,
    pub scan_concurrency: usize,
    pub scan_record_timeout_ms: u64,
    /// 0 desactiva el escaneo periódico
    pub scan_interval_secs: u64,
    pub insight_cache_ttl_secs: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            store_backend: StoreBackend::Postgres,
            scan_trip_limit: 100,
            scan_maintenance_limit: 50,
            scan_concurrency: 8,
            scan_record_timeout_ms: 5000,
            scan_interval_secs: 0,
            insight_cache_ttl_secs: 300,
        }
    }
}

fn var_or<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|e| {
            AppError::Configuration(format!("{} inválido ('{}'): {}", key, raw, e))
        }),
        _ => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Lee la configuración del entorno; las variables ausentes toman el
    /// valor por defecto, las que no se pueden parsear son un error
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            environment: var_or("ENVIRONMENT", defaults.environment)?,
            port: var_or("PORT", defaults.port)?,
            host: var_or("HOST", defaults.host)?,
            cors_origins,
            store_backend: var_or("STORE_BACKEND", defaults.store_backend)?,
            scan_trip_limit: var_or("SCAN_TRIP_LIMIT", defaults.scan_trip_limit)?,
            scan_maintenance_limit: var_or("SCAN_MAINTENANCE_LIMIT", defaults.scan_maintenance_limit)?,
            scan_concurrency: var_or("SCAN_CONCURRENCY", defaults.scan_concurrency)?,
            scan_record_timeout_ms: var_or("SCAN_RECORD_TIMEOUT_MS", defaults.scan_record_timeout_ms)?,
            scan_interval_secs: var_or("SCAN_INTERVAL_SECS", defaults.scan_interval_secs)?,
            insight_cache_ttl_secs: var_or("INSIGHT_CACHE_TTL_SECS", defaults.insight_cache_ttl_secs)?,
        };

        if config.scan_concurrency == 0 {
            return Err(AppError::Configuration(
                "SCAN_CONCURRENCY debe ser mayor que 0".to_string(),
            ));
        }
        Ok(config)
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            trip_limit: self.scan_trip_limit,
            maintenance_limit: self.scan_maintenance_limit,
            concurrency: self.scan_concurrency,
            record_timeout: Duration::from_millis(self.scan_record_timeout_ms),
        }
    }

    pub fn insight_cache_config(&self) -> InsightCacheConfig {
        InsightCacheConfig {
            ttl_secs: self.insight_cache_ttl_secs,
            ..Default::default()
        }
    }

    pub fn scan_interval(&self) -> Option<Duration> {
        (self.scan_interval_secs > 0).then(|| Duration::from_secs(self.scan_interval_secs))
    }
}
