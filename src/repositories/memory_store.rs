//! Record store en memoria
//!
//! Implementación de `FleetStore` sobre mapas protegidos por `RwLock`.
//! La usan los tests y el modo `STORE_BACKEND=memory`. Permite inyectar
//! fallos y latencia en las escrituras para ejercitar la tolerancia a
//! fallos parciales del escaneo.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Alert, AlertFilters, AlertStatus, AlertType, Driver, MaintenanceTask, NewAlert, Trip, Vehicle,
};
use crate::repositories::store::FleetStore;
use crate::utils::errors::{AppError, AppResult};

#[derive(Default)]
struct Tables {
    trips: HashMap<Uuid, Trip>,
    vehicles: HashMap<Uuid, Vehicle>,
    drivers: HashMap<Uuid, Driver>,
    maintenance: HashMap<Uuid, MaintenanceTask>,
    alerts: HashMap<Uuid, Alert>,
}

#[derive(Default)]
struct Faults {
    failing_alert_inserts: AtomicUsize,
    alert_insert_delay: RwLock<Option<Duration>>,
    failing_trip_updates: RwLock<HashSet<Uuid>>,
    failing_vehicle_trip_reads: RwLock<HashSet<Uuid>>,
}

#[derive(Clone, Default)]
pub struct InMemoryFleetStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_trip(&self, trip: Trip) {
        self.tables.write().await.trips.insert(trip.id, trip);
    }

    pub async fn put_vehicle(&self, vehicle: Vehicle) {
        self.tables.write().await.vehicles.insert(vehicle.id, vehicle);
    }

    pub async fn put_driver(&self, driver: Driver) {
        self.tables.write().await.drivers.insert(driver.id, driver);
    }

    pub async fn put_maintenance_task(&self, task: MaintenanceTask) {
        self.tables.write().await.maintenance.insert(task.id, task);
    }

    pub async fn alert_count(&self) -> usize {
        self.tables.read().await.alerts.len()
    }

    pub async fn all_alerts(&self) -> Vec<Alert> {
        self.tables.read().await.alerts.values().cloned().collect()
    }

    /// Las próximas `count` inserciones de alertas fallan
    pub fn fail_next_alert_inserts(&self, count: usize) {
        self.faults.failing_alert_inserts.store(count, Ordering::SeqCst);
    }

    /// Retrasa cada inserción de alerta
    pub async fn set_alert_insert_delay(&self, delay: Option<Duration>) {
        *self.faults.alert_insert_delay.write().await = delay;
    }

    pub async fn fail_trip_update(&self, trip_id: Uuid) {
        self.faults.failing_trip_updates.write().await.insert(trip_id);
    }

    pub async fn fail_vehicle_trip_reads(&self, vehicle_id: Uuid) {
        self.faults.failing_vehicle_trip_reads.write().await.insert(vehicle_id);
    }

    fn take_insert_failure(&self) -> bool {
        self.faults
            .failing_alert_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn sorted_tasks(mut tasks: Vec<MaintenanceTask>) -> Vec<MaintenanceTask> {
    tasks.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    tasks
}

#[async_trait]
impl FleetStore for InMemoryFleetStore {
    async fn list_recent_trips(&self, limit: i64) -> AppResult<Vec<Trip>> {
        let tables = self.tables.read().await;
        let mut trips: Vec<Trip> = tables.trips.values().cloned().collect();
        trips.sort_by(|a, b| {
            b.trip_end_date
                .cmp(&a.trip_end_date)
                .then_with(|| b.end_km.total_cmp(&a.end_km))
        });
        trips.truncate(limit.max(0) as usize);
        Ok(trips)
    }

    async fn list_vehicle_trips(&self, vehicle_id: Uuid) -> AppResult<Vec<Trip>> {
        if self.faults.failing_vehicle_trip_reads.read().await.contains(&vehicle_id) {
            return Err(AppError::Store(format!("trip read failed for vehicle {}", vehicle_id)));
        }
        let tables = self.tables.read().await;
        let mut trips: Vec<Trip> = tables
            .trips
            .values()
            .filter(|t| t.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        trips.sort_by(|a, b| {
            a.trip_start_date
                .cmp(&b.trip_start_date)
                .then_with(|| a.start_km.total_cmp(&b.start_km))
        });
        Ok(trips)
    }

    async fn list_trips_between(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Trip>> {
        let tables = self.tables.read().await;
        let mut trips: Vec<Trip> = tables
            .trips
            .values()
            .filter(|t| t.trip_start_date >= start && t.trip_start_date <= end)
            .cloned()
            .collect();
        trips.sort_by(|a, b| a.trip_start_date.cmp(&b.trip_start_date));
        Ok(trips)
    }

    async fn get_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
        Ok(self.tables.read().await.trips.get(&id).cloned())
    }

    async fn update_trip_kmpl(&self, id: Uuid, kmpl: Option<f64>) -> AppResult<()> {
        if self.faults.failing_trip_updates.read().await.contains(&id) {
            return Err(AppError::Store(format!("trip update failed for {}", id)));
        }
        let mut tables = self.tables.write().await;
        let trip = tables
            .trips
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Trip {} not found", id)))?;
        trip.calculated_kmpl = kmpl;
        Ok(())
    }

    async fn list_vehicles(&self, active_only: bool) -> AppResult<Vec<Vehicle>> {
        let tables = self.tables.read().await;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| !active_only || v.is_active())
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.registration_number.cmp(&b.registration_number));
        Ok(vehicles)
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.tables.read().await.vehicles.get(&id).cloned())
    }

    async fn list_drivers(&self) -> AppResult<Vec<Driver>> {
        let tables = self.tables.read().await;
        let mut drivers: Vec<Driver> = tables.drivers.values().cloned().collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(drivers)
    }

    async fn list_recent_maintenance(&self, limit: i64) -> AppResult<Vec<MaintenanceTask>> {
        let tables = self.tables.read().await;
        let mut tasks = sorted_tasks(tables.maintenance.values().cloned().collect());
        tasks.truncate(limit.max(0) as usize);
        Ok(tasks)
    }

    async fn list_vehicle_maintenance(&self, vehicle_id: Uuid) -> AppResult<Vec<MaintenanceTask>> {
        let tables = self.tables.read().await;
        Ok(sorted_tasks(
            tables
                .maintenance
                .values()
                .filter(|t| t.vehicle_id == vehicle_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_maintenance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<MaintenanceTask>> {
        let tables = self.tables.read().await;
        Ok(sorted_tasks(
            tables
                .maintenance
                .values()
                .filter(|t| t.start_date >= start && t.start_date <= end)
                .cloned()
                .collect(),
        ))
    }

    async fn get_maintenance_task(&self, id: Uuid) -> AppResult<Option<MaintenanceTask>> {
        Ok(self.tables.read().await.maintenance.get(&id).cloned())
    }

    async fn insert_alert(&self, alert: NewAlert) -> AppResult<Option<Alert>> {
        let delay = *self.faults.alert_insert_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.take_insert_failure() {
            return Err(AppError::Store("alert insert rejected".to_string()));
        }
        let mut tables = self.tables.write().await;
        let source_id = alert.source_id();
        let pending_exists = tables.alerts.values().any(|a| {
            a.alert_type == alert.alert_type
                && a.status == AlertStatus::Pending
                && a.source_id() == source_id
        });
        if pending_exists {
            return Ok(None);
        }
        let alert = alert.into_alert(Uuid::new_v4(), Utc::now());
        tables.alerts.insert(alert.id, alert.clone());
        Ok(Some(alert))
    }

    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>> {
        Ok(self.tables.read().await.alerts.get(&id).cloned())
    }

    async fn update_alert(&self, alert: &Alert) -> AppResult<Alert> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .alerts
            .get_mut(&alert.id)
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", alert.id)))?;
        stored.status = alert.status;
        stored.metadata = alert.metadata.clone();
        stored.updated_at = alert.updated_at;
        Ok(stored.clone())
    }

    async fn list_alerts(&self, filters: &AlertFilters) -> AppResult<Vec<Alert>> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<Alert> = tables
            .alerts
            .values()
            .filter(|a| filters.matches(a))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        alerts.truncate(filters.effective_limit() as usize);
        Ok(alerts)
    }

    async fn find_alert_for_source(
        &self,
        alert_type: AlertType,
        source_id: Uuid,
    ) -> AppResult<Option<Alert>> {
        let tables = self.tables.read().await;
        Ok(tables
            .alerts
            .values()
            .filter(|a| a.alert_type == alert_type && a.source_id() == source_id)
            .max_by_key(|a| a.created_at)
            .cloned())
    }
}
