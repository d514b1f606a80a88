use crate::models::{MaintenanceTask, ServiceGroup};
use crate::utils::errors::AppError;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const TASK_COLUMNS: &str = r#"
    id, vehicle_id, start_date, task_type, actual_cost, estimated_cost, downtime_days
"#;

// Fila de maintenance_service_groups
#[derive(Debug, sqlx::FromRow)]
struct ServiceGroupRow {
    task_id: Uuid,
    cost: Option<f64>,
}

#[derive(Clone)]
pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_recent(&self, limit: i64) -> Result<Vec<MaintenanceTask>, AppError> {
        let sql = format!(
            "SELECT {} FROM maintenance_tasks WHERE deleted_at IS NULL \
             ORDER BY start_date DESC LIMIT $1",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, MaintenanceTask>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        self.attach_service_groups(tasks).await
    }

    pub async fn find_by_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<MaintenanceTask>, AppError> {
        let sql = format!(
            "SELECT {} FROM maintenance_tasks WHERE vehicle_id = $1 AND deleted_at IS NULL \
             ORDER BY start_date DESC",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, MaintenanceTask>(&sql)
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await?;

        self.attach_service_groups(tasks).await
    }

    pub async fn find_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MaintenanceTask>, AppError> {
        let sql = format!(
            "SELECT {} FROM maintenance_tasks WHERE start_date BETWEEN $1 AND $2 \
             AND deleted_at IS NULL ORDER BY start_date DESC",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, MaintenanceTask>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        self.attach_service_groups(tasks).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MaintenanceTask>, AppError> {
        let sql = format!(
            "SELECT {} FROM maintenance_tasks WHERE id = $1 AND deleted_at IS NULL",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, MaintenanceTask>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match task {
            Some(task) => Ok(self.attach_service_groups(vec![task]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Adjunta los sub-registros de coste en una sola consulta
    async fn attach_service_groups(
        &self,
        mut tasks: Vec<MaintenanceTask>,
    ) -> Result<Vec<MaintenanceTask>, AppError> {
        if tasks.is_empty() {
            return Ok(tasks);
        }

        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        let rows = sqlx::query_as::<_, ServiceGroupRow>(
            "SELECT task_id, cost FROM maintenance_service_groups WHERE task_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut groups: HashMap<Uuid, Vec<ServiceGroup>> = HashMap::new();
        for row in rows {
            groups
                .entry(row.task_id)
                .or_default()
                .push(ServiceGroup { cost: row.cost });
        }

        for task in tasks.iter_mut() {
            task.service_groups = groups.remove(&task.id).unwrap_or_default();
        }

        Ok(tasks)
    }
}
