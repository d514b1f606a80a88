//! Record Store Gateway
//!
//! Acceso tipado a viajes, vehículos, conductores, mantenimiento y alertas.
//! El motor nunca asume transacciones entre escrituras de distintas entidades.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    Alert, AlertFilters, AlertType, Driver, MaintenanceTask, NewAlert, Trip, Vehicle,
};
use crate::utils::errors::AppResult;

#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Viajes más recientes, ordenados por fecha de fin descendente
    async fn list_recent_trips(&self, limit: i64) -> AppResult<Vec<Trip>>;

    /// Todos los viajes de un vehículo, por fecha de inicio ascendente
    async fn list_vehicle_trips(&self, vehicle_id: Uuid) -> AppResult<Vec<Trip>>;

    /// Viajes cuya fecha de inicio cae en `[start, end]`
    async fn list_trips_between(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Trip>>;

    async fn get_trip(&self, id: Uuid) -> AppResult<Option<Trip>>;

    async fn update_trip_kmpl(&self, id: Uuid, kmpl: Option<f64>) -> AppResult<()>;

    async fn list_vehicles(&self, active_only: bool) -> AppResult<Vec<Vehicle>>;

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;

    async fn list_drivers(&self) -> AppResult<Vec<Driver>>;

    /// Tareas más recientes (fecha de inicio descendente) con sus service_groups
    async fn list_recent_maintenance(&self, limit: i64) -> AppResult<Vec<MaintenanceTask>>;

    async fn list_vehicle_maintenance(&self, vehicle_id: Uuid) -> AppResult<Vec<MaintenanceTask>>;

    async fn list_maintenance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<MaintenanceTask>>;

    async fn get_maintenance_task(&self, id: Uuid) -> AppResult<Option<MaintenanceTask>>;

    /// Inserta la alerta como `pending`. `None` si ya existe una alerta
    /// pendiente del mismo tipo para el mismo registro origen.
    async fn insert_alert(&self, alert: NewAlert) -> AppResult<Option<Alert>>;

    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>>;

    /// Sobrescribe estado, metadata y updated_at (last write wins)
    async fn update_alert(&self, alert: &Alert) -> AppResult<Alert>;

    async fn list_alerts(&self, filters: &AlertFilters) -> AppResult<Vec<Alert>>;

    /// Alerta más reciente del tipo dado para el registro origen
    async fn find_alert_for_source(
        &self,
        alert_type: AlertType,
        source_id: Uuid,
    ) -> AppResult<Option<Alert>>;
}
