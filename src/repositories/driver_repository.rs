use crate::models::Driver;
use crate::utils::errors::AppError;
use sqlx::PgPool;

#[derive(Clone)]
pub struct DriverRepository {
    pool: PgPool,
}

impl DriverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self) -> Result<Vec<Driver>, AppError> {
        let drivers = sqlx::query_as::<_, Driver>(
            "SELECT id, name, primary_vehicle_id FROM drivers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(drivers)
    }
}
