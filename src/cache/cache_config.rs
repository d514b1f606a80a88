//! Configuración de cache
//!
//! Este módulo contiene la configuración de la caché de insights.

use serde::{Deserialize, Serialize};

/// Configuración de la caché de insights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightCacheConfig {
    /// Segundos que una entrada se considera válida
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for InsightCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300, // 5 minutos
            max_entries: 64,
        }
    }
}
