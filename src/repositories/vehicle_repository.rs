use crate::models::Vehicle;
use crate::utils::errors::AppError;
use sqlx::PgPool;
use uuid::Uuid;

const VEHICLE_COLUMNS: &str = r#"
    id, registration_number, current_odometer, status, insurance_cost, fitness_cost,
    permit_cost, puc_cost, tax_cost, other_documents
"#;

#[derive(Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self, active_only: bool) -> Result<Vec<Vehicle>, AppError> {
        let sql = if active_only {
            format!(
                "SELECT {} FROM vehicles WHERE status <> 'retired' ORDER BY registration_number",
                VEHICLE_COLUMNS
            )
        } else {
            format!("SELECT {} FROM vehicles ORDER BY registration_number", VEHICLE_COLUMNS)
        };

        let vehicles = sqlx::query_as::<_, Vehicle>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(vehicles)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        let sql = format!("SELECT {} FROM vehicles WHERE id = $1", VEHICLE_COLUMNS);
        let vehicle = sqlx::query_as::<_, Vehicle>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }
}
