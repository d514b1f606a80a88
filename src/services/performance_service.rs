//! Driver Performance & Insight Engine
//!
//! Agregación de métricas por conductor en un rango de fechas y cuatro
//! insights comparativos. Las funciones de cálculo son puras; el servicio
//! sólo carga los datos del store y cachea los insights por rango.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::cache::InsightCache;
use crate::models::{
    DateRange, Driver, FleetAverages, Insight, InsightMetadata, InsightType, MaintenanceTask,
    PerformanceMetrics, Severity, Trip, Vehicle,
};
use crate::repositories::FleetStore;
use crate::utils::errors::AppResult;
use crate::utils::numbers::{mean, percent_difference, ratio_or_zero, round_to};

/// Viajes con kmpl válido necesarios en cada periodo para comparar rendimiento
pub const MIN_MILEAGE_SAMPLE: usize = 3;

/// Vehículo asignado: el principal del conductor, o el de su último viaje
fn assigned_vehicle(driver: &Driver, trips: &[&Trip]) -> Option<Uuid> {
    driver.primary_vehicle_id.or_else(|| {
        trips
            .iter()
            .max_by_key(|t| t.trip_end_date)
            .map(|t| t.vehicle_id)
    })
}

fn driver_trips<'a>(driver_id: Uuid, trips: &'a [Trip], range: &DateRange) -> Vec<&'a Trip> {
    trips
        .iter()
        .filter(|t| t.driver_id == Some(driver_id) && range.contains(t.trip_start_date))
        .collect()
}

fn vehicle_tasks<'a>(
    vehicle_id: Uuid,
    tasks: &'a [MaintenanceTask],
    range: &DateRange,
) -> impl Iterator<Item = &'a MaintenanceTask> + 'a {
    let range = *range;
    tasks
        .iter()
        .filter(move |t| t.vehicle_id == vehicle_id && range.contains(t.start_date))
}

pub fn get_driver_performance_metrics(
    drivers: &[Driver],
    trips: &[Trip],
    vehicles: &[Vehicle],
    tasks: &[MaintenanceTask],
    range: &DateRange,
) -> Vec<PerformanceMetrics> {
    let vehicles_by_id: HashMap<Uuid, &Vehicle> = vehicles.iter().map(|v| (v.id, v)).collect();

    drivers
        .iter()
        .map(|driver| {
            let in_range = driver_trips(driver.id, trips, range);
            let vehicle_id = assigned_vehicle(driver, &in_range);

            // Distancias negativas son datos corruptos: no suman
            let total_distance: f64 = in_range.iter().map(|t| t.distance().max(0.0)).sum();
            let total_fuel: f64 = in_range.iter().map(|t| t.fuel()).sum();
            let total_gross_weight: f64 = in_range.iter().filter_map(|t| t.gross_weight).sum();
            let total_expenses: f64 = in_range.iter().map(|t| t.expense()).sum();
            let trip_dates: BTreeSet<_> = in_range.iter().map(|t| t.trip_start_date).collect();

            let days_under_maintenance = vehicle_id
                .map(|id| vehicle_tasks(id, tasks, range).map(|t| t.downtime()).sum())
                .unwrap_or(0);
            let documentation_expense = vehicle_id
                .and_then(|id| vehicles_by_id.get(&id))
                .map(|v| v.documentation_expense())
                .unwrap_or(0.0);

            PerformanceMetrics {
                driver_id: driver.id,
                driver_name: driver.name.clone(),
                vehicle_id,
                total_trips: in_range.len(),
                total_distance: round_to(total_distance, 2),
                total_fuel: round_to(total_fuel, 2),
                avg_mileage: round_to(ratio_or_zero(total_distance, total_fuel), 2),
                total_gross_weight: round_to(total_gross_weight, 2),
                avg_load_per_trip: round_to(
                    ratio_or_zero(total_gross_weight, in_range.len() as f64),
                    2,
                ),
                total_expenses: round_to(total_expenses, 2),
                cost_per_km: round_to(ratio_or_zero(total_expenses, total_distance), 2),
                utilization_days: trip_dates.len(),
                utilization_percentage: round_to(
                    ratio_or_zero(trip_dates.len() as f64, range.days() as f64) * 100.0,
                    2,
                ),
                days_under_maintenance,
                documentation_expense: round_to(documentation_expense, 2),
                last_trip_date: in_range.iter().map(|t| t.trip_end_date).max(),
            }
        })
        .collect()
}

/// Coste de mantenimiento de cada vehículo con tareas en el rango
pub fn maintenance_cost_by_vehicle(
    tasks: &[MaintenanceTask],
    range: &DateRange,
) -> HashMap<Uuid, f64> {
    let mut costs: HashMap<Uuid, f64> = HashMap::new();
    for task in tasks.iter().filter(|t| range.contains(t.start_date)) {
        *costs.entry(task.vehicle_id).or_default() += task.cost();
    }
    costs
}

pub fn compute_fleet_averages(
    metrics: &[PerformanceMetrics],
    tasks: &[MaintenanceTask],
    range: &DateRange,
) -> FleetAverages {
    let costs_per_km: Vec<f64> = metrics
        .iter()
        .filter(|m| m.total_distance > 0.0)
        .map(|m| m.cost_per_km)
        .collect();
    let vehicle_costs: Vec<f64> = maintenance_cost_by_vehicle(tasks, range)
        .into_values()
        .collect();

    FleetAverages {
        avg_cost_per_km: round_to(mean(&costs_per_km).unwrap_or(0.0), 2),
        avg_maintenance_cost_per_vehicle: round_to(mean(&vehicle_costs).unwrap_or(0.0), 2),
    }
}

pub fn cost_comparison_insight(
    metrics: &PerformanceMetrics,
    averages: &FleetAverages,
) -> Option<Insight> {
    if metrics.total_distance <= 0.0 || averages.avg_cost_per_km <= 0.0 {
        return None;
    }

    let difference = round_to(
        percent_difference(metrics.cost_per_km, averages.avg_cost_per_km),
        2,
    );
    let severity = if difference > 25.0 {
        Severity::High
    } else if difference > 10.0 {
        Severity::Medium
    } else {
        Severity::Low
    };
    let message = if difference > 0.0 {
        format!(
            "{}'s cost per km (₹{:.2}) is {:.1}% above the fleet average (₹{:.2})",
            metrics.driver_name, metrics.cost_per_km, difference, averages.avg_cost_per_km
        )
    } else {
        format!(
            "{} runs {:.1}% below the fleet average cost per km (₹{:.2} vs ₹{:.2})",
            metrics.driver_name,
            difference.abs(),
            metrics.cost_per_km,
            averages.avg_cost_per_km
        )
    };

    Some(Insight {
        insight_type: InsightType::CostComparison,
        driver_id: metrics.driver_id,
        message,
        severity,
        metadata: InsightMetadata::CostComparison {
            driver_cost_per_km: metrics.cost_per_km,
            fleet_average_cost_per_km: averages.avg_cost_per_km,
            percent_difference: difference,
        },
    })
}

/// Compara el kmpl medio del rango con el del periodo anterior de igual longitud
pub fn mileage_drop_insight(
    driver: &Driver,
    trips: &[Trip],
    range: &DateRange,
) -> Option<Insight> {
    let kmpl_in = |period: &DateRange| -> Vec<f64> {
        driver_trips(driver.id, trips, period)
            .iter()
            .filter_map(|t| t.qualifying_kmpl())
            .collect()
    };
    let current = kmpl_in(range);
    let previous = kmpl_in(&range.previous_period());
    if current.len() < MIN_MILEAGE_SAMPLE || previous.len() < MIN_MILEAGE_SAMPLE {
        return None;
    }

    let current_avg = mean(&current)?;
    let previous_avg = mean(&previous)?;
    let drop = round_to(-percent_difference(current_avg, previous_avg), 2);
    if drop <= 10.0 {
        return None;
    }
    let severity = if drop > 25.0 {
        Severity::High
    } else if drop > 15.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    Some(Insight {
        insight_type: InsightType::MileageDrop,
        driver_id: driver.id,
        message: format!(
            "{}'s average mileage dropped {:.1}% ({:.2} → {:.2} km/L) compared to the previous period",
            driver.name, drop, previous_avg, current_avg
        ),
        severity,
        metadata: InsightMetadata::MileageDrop {
            current_avg_kmpl: round_to(current_avg, 2),
            previous_avg_kmpl: round_to(previous_avg, 2),
            drop_percent: drop,
            current_trip_count: current.len(),
            previous_trip_count: previous.len(),
        },
    })
}

pub fn breakdown_frequency_insight(
    driver: &Driver,
    vehicle_id: Uuid,
    tasks: &[MaintenanceTask],
    range: &DateRange,
) -> Option<Insight> {
    let task_ids: Vec<Uuid> = vehicle_tasks(vehicle_id, tasks, range)
        .filter(|t| t.is_breakdown())
        .map(|t| t.id)
        .collect();
    if task_ids.len() < 2 {
        return None;
    }
    let severity = if task_ids.len() >= 3 { Severity::High } else { Severity::Medium };

    Some(Insight {
        insight_type: InsightType::BreakdownFrequency,
        driver_id: driver.id,
        message: format!(
            "Vehicle assigned to {} had {} breakdowns between {} and {}",
            driver.name,
            task_ids.len(),
            range.start,
            range.end
        ),
        severity,
        metadata: InsightMetadata::BreakdownFrequency {
            vehicle_id,
            breakdown_count: task_ids.len(),
            task_ids,
        },
    })
}

pub fn maintenance_cost_insight(
    driver: &Driver,
    vehicle_id: Uuid,
    tasks: &[MaintenanceTask],
    range: &DateRange,
    averages: &FleetAverages,
) -> Option<Insight> {
    let fleet_average = averages.avg_maintenance_cost_per_vehicle;
    if fleet_average <= 0.0 {
        return None;
    }
    let vehicle_cost: f64 = vehicle_tasks(vehicle_id, tasks, range).map(|t| t.cost()).sum();
    let above = round_to(percent_difference(vehicle_cost, fleet_average), 2);
    if above <= 20.0 {
        return None;
    }
    let severity = if above > 50.0 { Severity::High } else { Severity::Medium };

    Some(Insight {
        insight_type: InsightType::MaintenanceCost,
        driver_id: driver.id,
        message: format!(
            "Maintenance cost of the vehicle assigned to {} (₹{:.2}) is {:.1}% above the fleet average (₹{:.2})",
            driver.name, vehicle_cost, above, fleet_average
        ),
        severity,
        metadata: InsightMetadata::MaintenanceCost {
            vehicle_id,
            vehicle_maintenance_cost: round_to(vehicle_cost, 2),
            fleet_average_cost: fleet_average,
            percent_above: above,
        },
    })
}

/// Todos los insights del rango. `trips` debe cubrir también el periodo
/// anterior para que la comparación de rendimiento tenga datos.
pub fn generate_insights(
    drivers: &[Driver],
    trips: &[Trip],
    vehicles: &[Vehicle],
    tasks: &[MaintenanceTask],
    range: &DateRange,
) -> Vec<Insight> {
    let metrics = get_driver_performance_metrics(drivers, trips, vehicles, tasks, range);
    let averages = compute_fleet_averages(&metrics, tasks, range);

    let mut insights = Vec::new();
    for (driver, driver_metrics) in drivers.iter().zip(&metrics) {
        insights.extend(cost_comparison_insight(driver_metrics, &averages));
        insights.extend(mileage_drop_insight(driver, trips, range));
        if let Some(vehicle_id) = driver_metrics.vehicle_id {
            insights.extend(breakdown_frequency_insight(driver, vehicle_id, tasks, range));
            insights.extend(maintenance_cost_insight(driver, vehicle_id, tasks, range, &averages));
        }
    }
    insights.sort_by(|a, b| b.severity.cmp(&a.severity));
    insights
}

#[derive(Clone)]
pub struct PerformanceService {
    store: Arc<dyn FleetStore>,
    cache: InsightCache,
}

impl PerformanceService {
    pub fn new(store: Arc<dyn FleetStore>, cache: InsightCache) -> Self {
        Self { store, cache }
    }

    pub async fn driver_performance(&self, range: DateRange) -> AppResult<Vec<PerformanceMetrics>> {
        range.validate()?;
        let drivers = self.store.list_drivers().await?;
        let trips = self.store.list_trips_between(range.start, range.end).await?;
        let vehicles = self.store.list_vehicles(false).await?;
        let tasks = self.store.list_maintenance_between(range.start, range.end).await?;

        Ok(get_driver_performance_metrics(&drivers, &trips, &vehicles, &tasks, &range))
    }

    pub async fn driver_insights(&self, range: DateRange) -> AppResult<Vec<Insight>> {
        range.validate()?;
        if let Some(cached) = self.cache.get(&range).await {
            return Ok(cached);
        }

        let previous = range.previous_period();
        let drivers = self.store.list_drivers().await?;
        let trips = self.store.list_trips_between(previous.start, range.end).await?;
        let vehicles = self.store.list_vehicles(false).await?;
        let tasks = self.store.list_maintenance_between(range.start, range.end).await?;

        let insights = generate_insights(&drivers, &trips, &vehicles, &tasks, &range);
        info!(
            "💡 {} insights generados para {}..{}",
            insights.len(),
            range.start,
            range.end
        );
        self.cache.put(range, insights.clone()).await;
        Ok(insights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentCost, VehicleStatus};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn june() -> DateRange {
        DateRange::new(date(1), date(30))
    }

    fn driver(name: &str, vehicle_id: Option<Uuid>) -> Driver {
        Driver { id: Uuid::new_v4(), name: name.to_string(), primary_vehicle_id: vehicle_id }
    }

    fn trip(driver: &Driver, vehicle_id: Uuid, day: NaiveDate, km: f64, fuel: f64, expense: f64) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            vehicle_id,
            driver_id: Some(driver.id),
            trip_serial_number: None,
            trip_start_date: day,
            trip_end_date: day,
            start_km: 0.0,
            end_km: km,
            fuel_quantity: Some(fuel),
            refueling_done: fuel > 0.0,
            calculated_kmpl: None,
            route_deviation: None,
            gross_weight: Some(1000.0),
            total_expense: Some(expense),
            total_fuel_cost: None,
            total_road_expenses: None,
            short_trip: false,
        }
    }

    fn metrics_with_cost(cost_per_km: f64) -> PerformanceMetrics {
        PerformanceMetrics {
            driver_id: Uuid::new_v4(),
            driver_name: "A".to_string(),
            vehicle_id: None,
            total_trips: 1,
            total_distance: 100.0,
            total_fuel: 10.0,
            avg_mileage: 10.0,
            total_gross_weight: 0.0,
            avg_load_per_trip: 0.0,
            total_expenses: cost_per_km * 100.0,
            cost_per_km,
            utilization_days: 1,
            utilization_percentage: 0.0,
            days_under_maintenance: 0,
            documentation_expense: 0.0,
            last_trip_date: None,
        }
    }

    #[test]
    fn test_metrics_aggregation() {
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            registration_number: "MH12AB1234".to_string(),
            current_odometer: 0.0,
            status: VehicleStatus::Active,
            insurance_cost: Some(1000.0),
            fitness_cost: None,
            permit_cost: Some(500.0),
            puc_cost: None,
            tax_cost: None,
            other_documents: vec![DocumentCost { name: "state pass".to_string(), cost: Some(250.0) }],
        };
        let d = driver("Ravi", Some(vehicle.id));
        let trips = vec![
            trip(&d, vehicle.id, date(3), 300.0, 30.0, 3000.0),
            trip(&d, vehicle.id, date(3), 100.0, 10.0, 1000.0),
            trip(&d, vehicle.id, date(10), 200.0, 20.0, 2000.0),
            // Fuera de rango
            trip(&d, vehicle.id, NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(), 900.0, 90.0, 9000.0),
        ];
        let mut task = MaintenanceTask {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            start_date: date(12),
            task_type: "preventive".to_string(),
            service_groups: Vec::new(),
            actual_cost: Some(1500.0),
            estimated_cost: None,
            downtime_days: Some(2),
        };
        let out_of_range = MaintenanceTask { id: Uuid::new_v4(), start_date: date(1) - chrono::Duration::days(3), ..task.clone() };
        task.downtime_days = Some(3);

        let metrics = get_driver_performance_metrics(
            &[d.clone()],
            &trips,
            &[vehicle],
            &[task, out_of_range],
            &june(),
        );
        let m = &metrics[0];
        assert_eq!(m.total_trips, 3);
        assert_eq!(m.total_distance, 600.0);
        assert_eq!(m.total_fuel, 60.0);
        assert_eq!(m.avg_mileage, 10.0);
        assert_eq!(m.avg_load_per_trip, 1000.0);
        assert_eq!(m.cost_per_km, 10.0);
        assert_eq!(m.utilization_days, 2);
        assert_eq!(m.utilization_percentage, 6.67);
        assert_eq!(m.days_under_maintenance, 3);
        assert_eq!(m.documentation_expense, 1750.0);
        assert_eq!(m.last_trip_date, Some(date(10)));
    }

    #[test]
    fn test_driver_without_trips_has_zero_ratios() {
        let d = driver("Idle", None);
        let metrics = get_driver_performance_metrics(&[d], &[], &[], &[], &june());
        assert_eq!(metrics[0].avg_mileage, 0.0);
        assert_eq!(metrics[0].cost_per_km, 0.0);
        assert_eq!(metrics[0].vehicle_id, None);
    }

    #[test]
    fn test_cost_comparison_twenty_percent_is_medium() {
        let averages = FleetAverages { avg_cost_per_km: 10.0, avg_maintenance_cost_per_vehicle: 0.0 };
        let insight = cost_comparison_insight(&metrics_with_cost(12.0), &averages).unwrap();
        assert_eq!(insight.severity, Severity::Medium);
        assert_eq!(
            insight.metadata,
            InsightMetadata::CostComparison {
                driver_cost_per_km: 12.0,
                fleet_average_cost_per_km: 10.0,
                percent_difference: 20.0,
            }
        );

        let high = cost_comparison_insight(&metrics_with_cost(13.0), &averages).unwrap();
        assert_eq!(high.severity, Severity::High);
        let below = cost_comparison_insight(&metrics_with_cost(8.0), &averages).unwrap();
        assert_eq!(below.severity, Severity::Low);
        assert!(below.message.contains("below"));
    }

    #[test]
    fn test_fleet_average_ignores_drivers_without_distance() {
        let mut idle = metrics_with_cost(0.0);
        idle.total_distance = 0.0;
        let averages = compute_fleet_averages(&[metrics_with_cost(12.0), metrics_with_cost(8.0), idle], &[], &june());
        assert_eq!(averages.avg_cost_per_km, 10.0);
    }

    #[test]
    fn test_mileage_drop_needs_enough_trips_in_both_periods() {
        let vehicle_id = Uuid::new_v4();
        let d = driver("Asha", Some(vehicle_id));
        let previous_day = |n: u32| NaiveDate::from_ymd_opt(2024, 5, n).unwrap();

        let mut trips = Vec::new();
        for n in [5, 10, 15] {
            let mut t = trip(&d, vehicle_id, previous_day(n), 100.0, 10.0, 0.0);
            t.calculated_kmpl = Some(10.0);
            trips.push(t);
        }
        for n in [5, 10] {
            let mut t = trip(&d, vehicle_id, date(n), 100.0, 10.0, 0.0);
            t.calculated_kmpl = Some(7.0);
            trips.push(t);
        }
        assert!(mileage_drop_insight(&d, &trips, &june()).is_none());

        let mut third = trip(&d, vehicle_id, date(20), 100.0, 10.0, 0.0);
        third.calculated_kmpl = Some(7.0);
        trips.push(third);
        let insight = mileage_drop_insight(&d, &trips, &june()).unwrap();
        assert_eq!(insight.severity, Severity::High);
        match insight.metadata {
            InsightMetadata::MileageDrop { drop_percent, .. } => assert_eq!(drop_percent, 30.0),
            other => panic!("unexpected metadata {:?}", other),
        }
    }

    #[test]
    fn test_breakdown_and_maintenance_cost_insights() {
        let vehicle_id = Uuid::new_v4();
        let d = driver("Kiran", Some(vehicle_id));
        let task = |task_type: &str, cost: f64| MaintenanceTask {
            id: Uuid::new_v4(),
            vehicle_id,
            start_date: date(15),
            task_type: task_type.to_string(),
            service_groups: Vec::new(),
            actual_cost: Some(cost),
            estimated_cost: None,
            downtime_days: None,
        };
        let tasks = vec![task("accidental", 4000.0), task("Breakdown", 2000.0)];

        let breakdowns = breakdown_frequency_insight(&d, vehicle_id, &tasks, &june()).unwrap();
        assert_eq!(breakdowns.severity, Severity::Medium);
        assert!(breakdown_frequency_insight(&d, vehicle_id, &tasks[..1], &june()).is_none());

        let averages = FleetAverages { avg_cost_per_km: 0.0, avg_maintenance_cost_per_vehicle: 4000.0 };
        let cost = maintenance_cost_insight(&d, vehicle_id, &tasks, &june(), &averages).unwrap();
        assert_eq!(cost.severity, Severity::Medium);

        let cheap = FleetAverages { avg_cost_per_km: 0.0, avg_maintenance_cost_per_vehicle: 3000.0 };
        let cost = maintenance_cost_insight(&d, vehicle_id, &tasks, &june(), &cheap).unwrap();
        assert_eq!(cost.severity, Severity::High);
    }
}
