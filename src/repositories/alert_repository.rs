use crate::models::{Alert, AlertFilters, AlertType, NewAlert};
use crate::utils::errors::AppError;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const ALERT_COLUMNS: &str = r#"
    id, alert_type, severity, status, title, description, entity_type, entity_id,
    metadata, created_at, updated_at
"#;

#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// El índice parcial `idx_alerts_pending_source` descarta la inserción
    /// si ya hay una alerta pendiente para el mismo (tipo, origen)
    pub async fn create(&self, alert: NewAlert) -> Result<Option<Alert>, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let source_id = alert.source_id();

        let sql = format!(
            r#"
            INSERT INTO alerts (id, alert_type, severity, status, title, description,
                                entity_type, entity_id, source_id, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9, $10, $10)
            ON CONFLICT (alert_type, source_id) WHERE status = 'pending' DO NOTHING
            RETURNING {}
            "#,
            ALERT_COLUMNS
        );

        let alert = sqlx::query_as::<_, Alert>(&sql)
            .bind(id)
            .bind(alert.alert_type)
            .bind(alert.severity)
            .bind(alert.title)
            .bind(alert.description)
            .bind(alert.affected_entity.entity_type)
            .bind(alert.affected_entity.entity_id)
            .bind(source_id)
            .bind(Json(&alert.metadata))
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(alert)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Alert>, AppError> {
        let sql = format!("SELECT {} FROM alerts WHERE id = $1", ALERT_COLUMNS);
        let alert = sqlx::query_as::<_, Alert>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(alert)
    }

    pub async fn update_resolution(&self, alert: &Alert) -> Result<Alert, AppError> {
        let sql = format!(
            "UPDATE alerts SET status = $2, metadata = $3, updated_at = $4 WHERE id = $1 RETURNING {}",
            ALERT_COLUMNS
        );
        let updated = sqlx::query_as::<_, Alert>(&sql)
            .bind(alert.id)
            .bind(alert.status)
            .bind(Json(&alert.metadata))
            .bind(alert.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", alert.id)))?;

        Ok(updated)
    }

    pub async fn find_filtered(&self, filters: &AlertFilters) -> Result<Vec<Alert>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM alerts WHERE 1 = 1", ALERT_COLUMNS));

        if let Some(status) = filters.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(alert_type) = filters.alert_type {
            builder.push(" AND alert_type = ").push_bind(alert_type);
        }
        if let Some(severity) = filters.severity {
            builder.push(" AND severity = ").push_bind(severity);
        }
        if let Some(vehicle_id) = filters.vehicle_id {
            builder
                .push(" AND entity_type = 'vehicle' AND entity_id = ")
                .push_bind(vehicle_id);
        }

        builder
            .push(" ORDER BY severity DESC, created_at DESC LIMIT ")
            .push_bind(filters.effective_limit());

        let alerts = builder
            .build_query_as::<Alert>()
            .fetch_all(&self.pool)
            .await?;

        Ok(alerts)
    }

    pub async fn find_latest_for_source(
        &self,
        alert_type: AlertType,
        source_id: Uuid,
    ) -> Result<Option<Alert>, AppError> {
        let sql = format!(
            "SELECT {} FROM alerts WHERE alert_type = $1 AND source_id = $2 \
             ORDER BY created_at DESC LIMIT 1",
            ALERT_COLUMNS
        );
        let alert = sqlx::query_as::<_, Alert>(&sql)
            .bind(alert_type)
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(alert)
    }
}
