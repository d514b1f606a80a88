//! Modelos de rendimiento de conductores
//!
//! Métricas agregadas por conductor y rango de fechas, e insights
//! comparativos derivados de ellas.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::alert::Severity;

/// Rango de fechas inclusivo `[start, end]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Validate)]
#[validate(schema(function = "validate_date_range"))]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn validate_date_range(range: &DateRange) -> Result<(), ValidationError> {
    if range.start > range.end {
        let mut error = ValidationError::new("date_range");
        error.add_param("start".into(), &range.start.to_string());
        error.add_param("end".into(), &range.end.to_string());
        return Err(error);
    }
    Ok(())
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Número de días, ambos extremos incluidos
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Periodo de igual longitud inmediatamente anterior
    pub fn previous_period(&self) -> DateRange {
        let end = self.start - Duration::days(1);
        let start = end - Duration::days(self.days() - 1);
        DateRange { start, end }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub vehicle_id: Option<Uuid>,
    pub total_trips: usize,
    pub total_distance: f64,
    pub total_fuel: f64,
    pub avg_mileage: f64,
    pub total_gross_weight: f64,
    pub avg_load_per_trip: f64,
    pub total_expenses: f64,
    pub cost_per_km: f64,
    pub utilization_days: usize,
    pub utilization_percentage: f64,
    pub days_under_maintenance: i64,
    pub documentation_expense: f64,
    pub last_trip_date: Option<NaiveDate>,
}

/// Promedios de flota, calculados una vez por invocación
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FleetAverages {
    /// Media de cost_per_km entre conductores con distancia > 0
    pub avg_cost_per_km: f64,
    /// Media del coste de mantenimiento por vehículo con tareas en el rango
    pub avg_maintenance_cost_per_vehicle: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    CostComparison,
    MileageDrop,
    BreakdownFrequency,
    MaintenanceCost,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightMetadata {
    CostComparison {
        driver_cost_per_km: f64,
        fleet_average_cost_per_km: f64,
        percent_difference: f64,
    },
    MileageDrop {
        current_avg_kmpl: f64,
        previous_avg_kmpl: f64,
        drop_percent: f64,
        current_trip_count: usize,
        previous_trip_count: usize,
    },
    BreakdownFrequency {
        vehicle_id: Uuid,
        breakdown_count: usize,
        task_ids: Vec<Uuid>,
    },
    MaintenanceCost {
        vehicle_id: Uuid,
        vehicle_maintenance_cost: f64,
        fleet_average_cost: f64,
        percent_above: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub insight_type: InsightType,
    pub driver_id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub metadata: InsightMetadata,
}
