//! Conjunto de reglas de anomalías
//!
//! Cinco detectores independientes. Cada uno es una función pura
//! `(registro, contexto) -> Option<NewAlert>`; la persistencia la hace el
//! `AlertService`. Los datos que no cumplen la guarda de aplicabilidad
//! (viaje corto, sin repostaje, distancia no positiva, coste ausente)
//! simplemente no producen alerta.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::{
    AffectedEntity, AlertDetails, AlertMetadata, AlertType, FrequentMaintenanceDetails,
    FuelAnomalyDetails, HighExpenseSpikeDetails, LowMileageStreakDetails, MaintenanceTask,
    MileageBreach, NewAlert, RouteDeviationDetails, Severity, Trip,
};
use crate::utils::numbers::{mean, round_to};

/// Umbrales de los detectores
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyThresholds {
    /// km/L por encima del cual el rendimiento es sospechoso
    pub max_kmpl: f64,
    /// km/L por debajo del cual el rendimiento es sospechoso
    pub min_kmpl: f64,
    pub max_route_deviation_percent: f64,
    /// km/L que cuenta como "bajo" en una racha
    pub low_kmpl: f64,
    pub min_streak_length: usize,
    pub streak_window: usize,
    pub maintenance_window_days: i64,
    pub max_tasks_in_window: usize,
    pub expense_limit: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            max_kmpl: 30.0,
            min_kmpl: 4.0,
            max_route_deviation_percent: 8.0,
            low_kmpl: 6.0,
            min_streak_length: 3,
            streak_window: 5,
            maintenance_window_days: 30,
            max_tasks_in_window: 3,
            expense_limit: 10_000.0,
        }
    }
}

fn recommendations(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Porcentaje de incumplimiento relativo al umbral
fn deviation_from(threshold: f64, actual: f64) -> f64 {
    if threshold == 0.0 {
        return 0.0;
    }
    round_to(((actual - threshold) / threshold * 100.0).abs(), 2)
}

fn serial_label(trip: &Trip) -> String {
    trip.serial()
        .map(str::to_string)
        .unwrap_or_else(|| trip.id.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct AnomalyRuleSet {
    thresholds: AnomalyThresholds,
}

impl AnomalyRuleSet {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    /// Detectores de viaje: rendimiento, desviación de ruta y racha de bajo rendimiento
    pub fn evaluate_trip(&self, trip: &Trip, context: &[Trip]) -> Vec<NewAlert> {
        [
            self.detect_mileage_anomaly(trip),
            self.detect_route_deviation(trip),
            self.detect_low_mileage_streak(trip, context),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Detectores de mantenimiento: frecuencia y pico de gasto
    pub fn evaluate_task(&self, task: &MaintenanceTask, context: &[MaintenanceTask]) -> Vec<NewAlert> {
        [
            self.detect_frequent_maintenance(task, context),
            self.detect_high_expense_spike(task),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn detect_mileage_anomaly(&self, trip: &Trip) -> Option<NewAlert> {
        if !trip.refueling_done || trip.short_trip {
            return None;
        }
        let fuel = trip.fuel_quantity.filter(|f| *f > 0.0)?;
        let distance = trip.distance();
        if distance <= 0.0 {
            return None;
        }

        let mileage = distance / fuel;
        let th = &self.thresholds;
        let (breach, threshold, severity) = if mileage > th.max_kmpl {
            (MileageBreach::AboveMaximum, th.max_kmpl, Severity::Medium)
        } else if mileage < th.min_kmpl {
            (MileageBreach::BelowMinimum, th.min_kmpl, Severity::High)
        } else {
            return None;
        };

        let label = serial_label(trip);
        let (title, description, recs) = match breach {
            MileageBreach::AboveMaximum => (
                "Unusually high mileage",
                format!(
                    "Trip {} reports {:.2} km/L, above the expected maximum of {:.0} km/L",
                    label, mileage, threshold
                ),
                recommendations(&[
                    "Verify the start and end odometer readings",
                    "Confirm the fuel quantity against the fuel bill",
                    "Check whether a partial refuel was recorded as a full tank",
                ]),
            ),
            MileageBreach::BelowMinimum => (
                "Unusually low mileage",
                format!(
                    "Trip {} reports {:.2} km/L, below the expected minimum of {:.0} km/L",
                    label, mileage, threshold
                ),
                recommendations(&[
                    "Inspect the vehicle for fuel leaks or engine issues",
                    "Check for fuel pilferage or unauthorized usage",
                    "Review idling and harsh acceleration with the driver",
                    "Verify the recorded fuel quantity",
                ]),
            ),
        };

        Some(NewAlert {
            alert_type: AlertType::FuelAnomaly,
            severity,
            title: title.to_string(),
            description,
            affected_entity: AffectedEntity::vehicle(trip.vehicle_id),
            metadata: AlertMetadata::new(
                threshold,
                round_to(mileage, 2),
                deviation_from(threshold, mileage),
                recs,
                AlertDetails::FuelAnomaly(FuelAnomalyDetails {
                    trip_id: trip.id,
                    trip_serial_number: trip.trip_serial_number.clone(),
                    distance_km: round_to(distance, 2),
                    fuel_quantity: fuel,
                    breach,
                }),
            ),
        })
    }

    pub fn detect_route_deviation(&self, trip: &Trip) -> Option<NewAlert> {
        if trip.short_trip {
            return None;
        }
        let deviation = trip.route_deviation.filter(|d| d.is_finite())?;
        let threshold = self.thresholds.max_route_deviation_percent;
        if deviation <= threshold {
            return None;
        }

        Some(NewAlert {
            alert_type: AlertType::RouteDeviation,
            severity: Severity::Medium,
            title: "Route deviation detected".to_string(),
            description: format!(
                "Trip {} deviated {:.1}% from the planned route (limit {:.0}%)",
                serial_label(trip),
                deviation,
                threshold
            ),
            affected_entity: AffectedEntity::vehicle(trip.vehicle_id),
            metadata: AlertMetadata::new(
                threshold,
                round_to(deviation, 2),
                deviation_from(threshold, deviation),
                recommendations(&[
                    "Compare the actual route with the planned route",
                    "Check for unauthorized stops or detours",
                    "Discuss the route choice with the driver",
                ]),
                AlertDetails::RouteDeviation(RouteDeviationDetails {
                    trip_id: trip.id,
                    trip_serial_number: trip.trip_serial_number.clone(),
                    threshold_percent: threshold,
                }),
            ),
        })
    }

    /// Recorre hacia atrás los viajes del vehículo (fin descendente, máx.
    /// `streak_window`) empezando por `trip`, contando mientras el kmpl siga
    /// por debajo de `low_kmpl`.
    pub fn detect_low_mileage_streak(&self, trip: &Trip, context: &[Trip]) -> Option<NewAlert> {
        let th = &self.thresholds;
        let current_kmpl = trip.qualifying_kmpl()?;
        if current_kmpl >= th.low_kmpl {
            return None;
        }

        let mut history: Vec<&Trip> = context
            .iter()
            .filter(|t| t.vehicle_id == trip.vehicle_id && t.id != trip.id)
            .filter(|t| t.qualifying_kmpl().is_some())
            .filter(|t| {
                (t.trip_end_date, t.end_km) <= (trip.trip_end_date, trip.end_km)
            })
            .collect();
        history.push(trip);
        history.sort_by(|a, b| {
            b.trip_end_date
                .cmp(&a.trip_end_date)
                .then_with(|| b.end_km.total_cmp(&a.end_km))
        });

        let start = history.iter().position(|t| t.id == trip.id).unwrap_or(0);
        let streak: Vec<&Trip> = history[start..]
            .iter()
            .take(th.streak_window)
            .take_while(|t| t.qualifying_kmpl().map_or(false, |k| k < th.low_kmpl))
            .copied()
            .collect();

        if streak.len() < th.min_streak_length {
            return None;
        }

        let values: Vec<f64> = streak.iter().filter_map(|t| t.qualifying_kmpl()).collect();
        let average = mean(&values).unwrap_or(current_kmpl);

        Some(NewAlert {
            alert_type: AlertType::LowMileageStreak,
            severity: Severity::Medium,
            title: "Low mileage streak".to_string(),
            description: format!(
                "{} consecutive trips below {:.0} km/L (average {:.2} km/L)",
                streak.len(),
                th.low_kmpl,
                average
            ),
            affected_entity: AffectedEntity::vehicle(trip.vehicle_id),
            metadata: AlertMetadata::new(
                th.low_kmpl,
                round_to(average, 2),
                deviation_from(th.low_kmpl, average),
                recommendations(&[
                    "Schedule an engine and fuel system inspection",
                    "Check tyre pressure and wheel alignment",
                    "Review the load carried on these trips",
                    "Counsel the driver on fuel-efficient driving",
                ]),
                AlertDetails::LowMileageStreak(LowMileageStreakDetails {
                    trip_id: trip.id,
                    streak_length: streak.len(),
                    streak_trip_ids: streak.iter().map(|t| t.id).collect(),
                    streak_values: values,
                }),
            ),
        })
    }

    /// Cuenta tareas del mismo vehículo en ±`maintenance_window_days` de
    /// la fecha de inicio de `task` (ventana simétrica, incluye la propia tarea)
    pub fn detect_frequent_maintenance(
        &self,
        task: &MaintenanceTask,
        context: &[MaintenanceTask],
    ) -> Option<NewAlert> {
        let th = &self.thresholds;
        let window = Duration::days(th.maintenance_window_days);
        let window_start = task.start_date - window;
        let window_end = task.start_date + window;

        let mut related: Vec<&MaintenanceTask> = context
            .iter()
            .filter(|t| t.vehicle_id == task.vehicle_id && t.id != task.id)
            .filter(|t| t.start_date >= window_start && t.start_date <= window_end)
            .collect();
        related.sort_by_key(|t| t.start_date);

        let count = related.len() + 1;
        if count < th.max_tasks_in_window {
            return None;
        }

        let threshold = th.max_tasks_in_window as f64;
        Some(NewAlert {
            alert_type: AlertType::FrequentMaintenance,
            severity: Severity::Medium,
            title: "Frequent maintenance".to_string(),
            description: format!(
                "{} maintenance tasks within {} days of {}",
                count, th.maintenance_window_days, task.start_date
            ),
            affected_entity: AffectedEntity::vehicle(task.vehicle_id),
            metadata: AlertMetadata::new(
                threshold,
                count as f64,
                deviation_from(threshold, count as f64),
                recommendations(&[
                    "Perform a root-cause analysis of the recurring issues",
                    "Review the quality of previous repairs and the workshop used",
                    "Consider a comprehensive overhaul or replacing the vehicle",
                ]),
                AlertDetails::FrequentMaintenance(FrequentMaintenanceDetails {
                    task_id: task.id,
                    window_days: th.maintenance_window_days,
                    task_count: count,
                    related_task_ids: related.iter().map(|t| t.id).collect(),
                    window_start,
                    window_end,
                }),
            ),
        })
    }

    pub fn detect_high_expense_spike(&self, task: &MaintenanceTask) -> Option<NewAlert> {
        let (cost, source) = task.resolved_cost()?;
        let limit = self.thresholds.expense_limit;
        if cost <= limit {
            return None;
        }

        Some(NewAlert {
            alert_type: AlertType::HighExpenseSpike,
            severity: Severity::High,
            title: "High maintenance expense".to_string(),
            description: format!(
                "{} maintenance cost ₹{:.2} exceeds the ₹{:.0} limit",
                task.task_type, cost, limit
            ),
            affected_entity: AffectedEntity::vehicle(task.vehicle_id),
            metadata: AlertMetadata::new(
                limit,
                round_to(cost, 2),
                deviation_from(limit, cost),
                recommendations(&[
                    "Verify the invoice and the itemized costs",
                    "Obtain a second quotation for major repairs",
                    "Check whether the repair is covered by warranty or insurance",
                ]),
                AlertDetails::HighExpenseSpike(HighExpenseSpikeDetails {
                    task_id: task.id,
                    task_type: task.task_type.clone(),
                    cost_source: source,
                }),
            ),
        })
    }
}
