//! Configuración de conexión a PostgreSQL
//!
//! Este módulo abre el pool del record store y aplica las migraciones.

use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::utils::errors::AppError;

/// Pool de conexiones ya migrado
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!("🗄️ Conectando a {}", mask_database_url(&config.url));
        let pool = config.create_pool().await?;
        let connection = Self { pool };
        connection.run_migrations().await?;
        info!("✅ Base de datos lista");
        Ok(connection)
    }

    /// Conexión usando `DATABASE_URL`
    pub async fn new_default() -> Result<Self, AppError> {
        Self::new(&DatabaseConfig::from_env()?).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ejecutar migraciones de la base de datos
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Función helper para enmascarar la URL de la base de datos en logs
fn mask_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at_pos)) if at_pos > scheme_end => {
            format!("{}***:***@{}", &url[..scheme_end + 3], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}
