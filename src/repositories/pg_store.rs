//! `FleetStore` sobre PostgreSQL
//!
//! Compone los repositorios por entidad sobre un único pool.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Alert, AlertFilters, AlertType, Driver, MaintenanceTask, NewAlert, Trip, Vehicle,
};
use crate::repositories::{
    alert_repository::AlertRepository, driver_repository::DriverRepository,
    maintenance_repository::MaintenanceRepository, store::FleetStore,
    trip_repository::TripRepository, vehicle_repository::VehicleRepository,
};
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct PgFleetStore {
    trips: TripRepository,
    vehicles: VehicleRepository,
    drivers: DriverRepository,
    maintenance: MaintenanceRepository,
    alerts: AlertRepository,
}

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            trips: TripRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool.clone()),
            drivers: DriverRepository::new(pool.clone()),
            maintenance: MaintenanceRepository::new(pool.clone()),
            alerts: AlertRepository::new(pool),
        }
    }
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn list_recent_trips(&self, limit: i64) -> AppResult<Vec<Trip>> {
        self.trips.find_recent(limit).await
    }

    async fn list_vehicle_trips(&self, vehicle_id: Uuid) -> AppResult<Vec<Trip>> {
        self.trips.find_by_vehicle(vehicle_id).await
    }

    async fn list_trips_between(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Trip>> {
        self.trips.find_between(start, end).await
    }

    async fn get_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
        self.trips.find_by_id(id).await
    }

    async fn update_trip_kmpl(&self, id: Uuid, kmpl: Option<f64>) -> AppResult<()> {
        self.trips.update_kmpl(id, kmpl).await
    }

    async fn list_vehicles(&self, active_only: bool) -> AppResult<Vec<Vehicle>> {
        self.vehicles.find_all(active_only).await
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        self.vehicles.find_by_id(id).await
    }

    async fn list_drivers(&self) -> AppResult<Vec<Driver>> {
        self.drivers.find_all().await
    }

    async fn list_recent_maintenance(&self, limit: i64) -> AppResult<Vec<MaintenanceTask>> {
        self.maintenance.find_recent(limit).await
    }

    async fn list_vehicle_maintenance(&self, vehicle_id: Uuid) -> AppResult<Vec<MaintenanceTask>> {
        self.maintenance.find_by_vehicle(vehicle_id).await
    }

    async fn list_maintenance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<MaintenanceTask>> {
        self.maintenance.find_between(start, end).await
    }

    async fn get_maintenance_task(&self, id: Uuid) -> AppResult<Option<MaintenanceTask>> {
        self.maintenance.find_by_id(id).await
    }

    async fn insert_alert(&self, alert: NewAlert) -> AppResult<Option<Alert>> {
        self.alerts.create(alert).await
    }

    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>> {
        self.alerts.find_by_id(id).await
    }

    async fn update_alert(&self, alert: &Alert) -> AppResult<Alert> {
        self.alerts.update_resolution(alert).await
    }

    async fn list_alerts(&self, filters: &AlertFilters) -> AppResult<Vec<Alert>> {
        self.alerts.find_filtered(filters).await
    }

    async fn find_alert_for_source(
        &self,
        alert_type: AlertType,
        source_id: Uuid,
    ) -> AppResult<Option<Alert>> {
        self.alerts.find_latest_for_source(alert_type, source_id).await
    }
}
