//! Scan Orchestrator
//!
//! Pasada batch sobre los viajes y tareas de mantenimiento más recientes.
//! Cada registro es una unidad de trabajo independiente: se ejecuta con
//! timeout propio, sus fallos se registran y se omiten, y el escaneo puede
//! cancelarse sin dejar escrituras a medias.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{Alert, MaintenanceTask, NewAlert, Trip};
use crate::repositories::FleetStore;
use crate::services::alert_service::AlertService;
use crate::services::anomaly_rules::AnomalyRuleSet;
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub trip_limit: i64,
    pub maintenance_limit: i64,
    pub concurrency: usize,
    pub record_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            trip_limit: 100,
            maintenance_limit: 50,
            concurrency: 8,
            record_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ScanSummary {
    pub alerts_created: usize,
    pub trips_scanned: usize,
    pub tasks_scanned: usize,
    pub failures: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub duration_ms: u64,
}

/// Canal de cancelación: enviar `true` detiene las unidades aún no iniciadas
pub fn cancellation_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

enum ScanUnit {
    Trip(Trip),
    Task(MaintenanceTask),
}

impl ScanUnit {
    fn id(&self) -> Uuid {
        match self {
            ScanUnit::Trip(trip) => trip.id,
            ScanUnit::Task(task) => task.id,
        }
    }
}

#[derive(Default)]
struct UnitOutcome {
    created: usize,
    failures: usize,
    timed_out: bool,
    cancelled: bool,
    is_trip: bool,
}

#[derive(Clone)]
pub struct ScanService {
    store: Arc<dyn FleetStore>,
    alerts: AlertService,
    rules: AnomalyRuleSet,
    options: ScanOptions,
}

impl ScanService {
    pub fn new(
        store: Arc<dyn FleetStore>,
        alerts: AlertService,
        rules: AnomalyRuleSet,
        options: ScanOptions,
    ) -> Self {
        Self { store, alerts, rules, options }
    }

    /// Escaneo completo sin cancelación; devuelve el número de alertas creadas
    pub async fn run_alert_scan(&self) -> usize {
        let (_tx, rx) = cancellation_channel();
        self.run_scan(&rx).await.alerts_created
    }

    pub async fn run_scan(&self, cancel: &watch::Receiver<bool>) -> ScanSummary {
        let started = Instant::now();
        let mut summary = ScanSummary::default();
        info!("🔎 Iniciando escaneo de anomalías");

        let trips = match self.store.list_recent_trips(self.options.trip_limit).await {
            Ok(trips) => trips,
            Err(e) => {
                error!("❌ No se pudieron cargar los viajes recientes: {}", e);
                summary.failures += 1;
                Vec::new()
            }
        };
        let tasks = match self
            .store
            .list_recent_maintenance(self.options.maintenance_limit)
            .await
        {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("❌ No se pudieron cargar las tareas de mantenimiento: {}", e);
                summary.failures += 1;
                Vec::new()
            }
        };

        // El contexto de rachas y frecuencias es la ventana cargada, no el histórico completo
        let trip_context = Arc::new(trips.clone());
        let task_context = Arc::new(tasks.clone());

        let units = trips
            .into_iter()
            .map(ScanUnit::Trip)
            .chain(tasks.into_iter().map(ScanUnit::Task))
            .map(|unit| {
                let trip_context = Arc::clone(&trip_context);
                let task_context = Arc::clone(&task_context);
                let cancel = cancel.clone();
                async move { self.run_unit(unit, &trip_context, &task_context, &cancel).await }
            });

        let outcomes: Vec<UnitOutcome> = stream::iter(units)
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            if outcome.cancelled {
                summary.cancelled += 1;
                continue;
            }
            if outcome.is_trip {
                summary.trips_scanned += 1;
            } else {
                summary.tasks_scanned += 1;
            }
            summary.alerts_created += outcome.created;
            summary.failures += outcome.failures;
            if outcome.timed_out {
                summary.timed_out += 1;
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "📊 Escaneo terminado: {} alertas, {} viajes, {} tareas, {} fallos, {} timeouts, {} canceladas ({} ms)",
            summary.alerts_created,
            summary.trips_scanned,
            summary.tasks_scanned,
            summary.failures,
            summary.timed_out,
            summary.cancelled,
            summary.duration_ms
        );
        summary
    }

    async fn run_unit(
        &self,
        unit: ScanUnit,
        trip_context: &[Trip],
        task_context: &[MaintenanceTask],
        cancel: &watch::Receiver<bool>,
    ) -> UnitOutcome {
        let is_trip = matches!(unit, ScanUnit::Trip(_));
        if *cancel.borrow() {
            return UnitOutcome { cancelled: true, is_trip, ..Default::default() };
        }

        let unit_id = unit.id();
        let candidates = match &unit {
            ScanUnit::Trip(trip) => self.rules.evaluate_trip(trip, trip_context),
            ScanUnit::Task(task) => self.rules.evaluate_task(task, task_context),
        };

        // Las alertas guardadas antes del timeout siguen contando
        let mut created = Vec::new();
        let mut failures = 0;
        let finished = tokio::time::timeout(
            self.options.record_timeout,
            self.persist_into(candidates, &mut created, &mut failures),
        )
        .await
        .is_ok();

        if !finished {
            warn!(
                "⏱️ Timeout ({} ms) procesando el registro {} ({} alertas ya guardadas)",
                self.options.record_timeout.as_millis(),
                unit_id,
                created.len()
            );
        }
        UnitOutcome {
            created: created.len(),
            failures,
            timed_out: !finished,
            cancelled: false,
            is_trip,
        }
    }

    async fn persist(&self, candidates: Vec<NewAlert>) -> (Vec<Alert>, usize) {
        let mut created = Vec::new();
        let mut failures = 0;
        self.persist_into(candidates, &mut created, &mut failures).await;
        (created, failures)
    }

    /// Persiste cada alerta por separado; un fallo no impide las demás
    async fn persist_into(
        &self,
        candidates: Vec<NewAlert>,
        created: &mut Vec<Alert>,
        failures: &mut usize,
    ) {
        for candidate in candidates {
            let alert_type = candidate.alert_type;
            let source_id = candidate.source_id();
            match self.alerts.create_alert(candidate).await {
                Ok(Some(alert)) => created.push(alert),
                Ok(None) => {}
                Err(e) => {
                    *failures += 1;
                    error!(
                        "❌ Error guardando alerta {} para {}: {}",
                        alert_type.as_str(),
                        source_id,
                        e
                    );
                }
            }
        }
    }

    /// Evalúa los detectores de viaje para un único viaje, con el
    /// histórico de su vehículo como contexto
    pub async fn scan_trip(&self, trip_id: Uuid) -> AppResult<Vec<Alert>> {
        let trip = self
            .store
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trip {} not found", trip_id)))?;
        let history = self.store.list_vehicle_trips(trip.vehicle_id).await?;

        let (created, failures) = self.persist(self.rules.evaluate_trip(&trip, &history)).await;
        if failures > 0 {
            warn!("⚠️ {} alertas no guardadas para el viaje {}", failures, trip_id);
        }
        Ok(created)
    }

    pub async fn scan_maintenance_task(&self, task_id: Uuid) -> AppResult<Vec<Alert>> {
        let task = self
            .store
            .get_maintenance_task(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance task {} not found", task_id)))?;
        let history = self.store.list_vehicle_maintenance(task.vehicle_id).await?;

        let (created, failures) = self.persist(self.rules.evaluate_task(&task, &history)).await;
        if failures > 0 {
            warn!("⚠️ {} alertas no guardadas para la tarea {}", failures, task_id);
        }
        Ok(created)
    }
}
