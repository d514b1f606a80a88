use crate::models::Trip;
use crate::utils::errors::AppError;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

const TRIP_COLUMNS: &str = r#"
    id, vehicle_id, driver_id, trip_serial_number, trip_start_date, trip_end_date,
    start_km, end_km, fuel_quantity, refueling_done, calculated_kmpl, route_deviation,
    gross_weight, total_expense, total_fuel_cost, total_road_expenses, short_trip
"#;

#[derive(Clone)]
pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_recent(&self, limit: i64) -> Result<Vec<Trip>, AppError> {
        let sql = format!(
            "SELECT {} FROM trips WHERE deleted_at IS NULL \
             ORDER BY trip_end_date DESC, end_km DESC LIMIT $1",
            TRIP_COLUMNS
        );
        let trips = sqlx::query_as::<_, Trip>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(trips)
    }

    pub async fn find_by_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<Trip>, AppError> {
        let sql = format!(
            "SELECT {} FROM trips WHERE vehicle_id = $1 AND deleted_at IS NULL \
             ORDER BY trip_start_date ASC, start_km ASC",
            TRIP_COLUMNS
        );
        let trips = sqlx::query_as::<_, Trip>(&sql)
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(trips)
    }

    pub async fn find_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Trip>, AppError> {
        let sql = format!(
            "SELECT {} FROM trips WHERE trip_start_date BETWEEN $1 AND $2 \
             AND deleted_at IS NULL ORDER BY trip_start_date ASC",
            TRIP_COLUMNS
        );
        let trips = sqlx::query_as::<_, Trip>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(trips)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>, AppError> {
        let sql = format!(
            "SELECT {} FROM trips WHERE id = $1 AND deleted_at IS NULL",
            TRIP_COLUMNS
        );
        let trip = sqlx::query_as::<_, Trip>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(trip)
    }

    pub async fn update_kmpl(&self, id: Uuid, kmpl: Option<f64>) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE trips SET calculated_kmpl = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(kmpl)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Trip {} not found", id)));
        }

        Ok(())
    }
}
