//! Recálculo en cascada de `calculated_kmpl`
//!
//! Método de tanque lleno: los km desde el repostaje anterior del mismo
//! vehículo divididos por el combustible cargado. Al editar un viaje se
//! recalcula ese viaje y todos los repostajes posteriores, en orden
//! cronológico. Las cascadas de un mismo vehículo se serializan con un
//! mutex por vehículo; vehículos distintos avanzan en paralelo.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::cache::InsightCache;
use crate::models::Trip;
use crate::repositories::FleetStore;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::numbers::round_to;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RecalculationSummary {
    pub vehicle_id: Uuid,
    pub trips_considered: usize,
    pub trips_updated: usize,
    pub failures: usize,
}

/// kmpl de un repostaje dado el repostaje anterior del vehículo (si existe)
pub fn compute_kmpl(trip: &Trip, previous_refuel: Option<&Trip>) -> Option<f64> {
    if !trip.has_meaningful_kmpl() {
        return None;
    }
    let distance = match previous_refuel {
        Some(previous) => trip.end_km - previous.end_km,
        None => trip.distance(),
    };
    if distance <= 0.0 {
        return None;
    }
    Some(round_to(distance / trip.fuel(), 2))
}

/// Cambios de kmpl a aplicar tras editar `edited`, en orden cronológico.
/// Sólo devuelve los viajes cuyo valor almacenado difiere del recalculado.
pub fn plan_recalculation(edited: &Trip, history: &[Trip]) -> (usize, Vec<(Uuid, Option<f64>)>) {
    let mut ordered: Vec<&Trip> = history
        .iter()
        .filter(|t| t.vehicle_id == edited.vehicle_id)
        .collect();
    ordered.sort_by(|a, b| {
        a.trip_start_date
            .cmp(&b.trip_start_date)
            .then_with(|| a.trip_end_date.cmp(&b.trip_end_date))
            .then_with(|| a.start_km.total_cmp(&b.start_km))
    });

    let mut considered = 0;
    let mut changes = Vec::new();
    let mut previous_refuel: Option<&Trip> = None;

    for trip in ordered {
        let is_target = trip.id == edited.id
            || (trip.trip_start_date >= edited.trip_end_date && trip.is_refueling());
        if is_target {
            considered += 1;
            let kmpl = compute_kmpl(trip, previous_refuel);
            if kmpl != trip.calculated_kmpl {
                changes.push((trip.id, kmpl));
            }
        }
        if trip.is_refueling() {
            previous_refuel = Some(trip);
        }
    }

    (considered, changes)
}

#[derive(Clone)]
pub struct MileageService {
    store: Arc<dyn FleetStore>,
    // Los insights de rendimiento leen `calculated_kmpl`
    insights: InsightCache,
    vehicle_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl MileageService {
    pub fn new(store: Arc<dyn FleetStore>, insights: InsightCache) -> Self {
        Self {
            store,
            insights,
            vehicle_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock_for(&self, vehicle_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.vehicle_locks.lock().await;
        Arc::clone(locks.entry(vehicle_id).or_default())
    }

    pub async fn recalculate_from_trip(&self, trip_id: Uuid) -> AppResult<RecalculationSummary> {
        let trip = self
            .store
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trip {} not found", trip_id)))?;

        let lock = self.lock_for(trip.vehicle_id).await;
        let _guard = lock.lock().await;

        // Releer bajo el lock: otra cascada pudo modificar el histórico
        let history = self.store.list_vehicle_trips(trip.vehicle_id).await?;
        let edited = history.iter().find(|t| t.id == trip_id).unwrap_or(&trip);
        let (considered, changes) = plan_recalculation(edited, &history);

        let mut summary = RecalculationSummary {
            vehicle_id: trip.vehicle_id,
            trips_considered: considered,
            ..Default::default()
        };

        for (id, kmpl) in changes {
            match self.store.update_trip_kmpl(id, kmpl).await {
                Ok(()) => summary.trips_updated += 1,
                Err(e) => {
                    summary.failures += 1;
                    error!("❌ Error actualizando kmpl del viaje {}: {}", id, e);
                }
            }
        }

        if summary.trips_updated > 0 {
            self.insights.invalidate_all().await;
        }

        info!(
            "⛽ Recálculo de kmpl para vehículo {}: {} considerados, {} actualizados, {} fallos",
            summary.vehicle_id, summary.trips_considered, summary.trips_updated, summary.failures
        );
        Ok(summary)
    }
}
