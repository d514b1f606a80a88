//! Modelo de Trip
//!
//! Un viaje registrado para un vehículo. Mapea a la tabla `trips`;
//! los viajes con `deleted_at` no nulo nunca llegan al motor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Viaje tal como lo entrega el record store
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Trip {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    /// Número de serie con alcance de vehículo, p.ej. `ABC1234007`
    pub trip_serial_number: Option<String>,
    pub trip_start_date: NaiveDate,
    pub trip_end_date: NaiveDate,
    pub start_km: f64,
    pub end_km: f64,
    pub fuel_quantity: Option<f64>,
    pub refueling_done: bool,
    pub calculated_kmpl: Option<f64>,
    /// Desviación de ruta en porcentaje, precalculada fuera del motor
    pub route_deviation: Option<f64>,
    pub gross_weight: Option<f64>,
    pub total_expense: Option<f64>,
    pub total_fuel_cost: Option<f64>,
    pub total_road_expenses: Option<f64>,
    pub short_trip: bool,
}

impl Trip {
    /// Distancia recorrida (puede ser negativa si los datos están corruptos)
    pub fn distance(&self) -> f64 {
        self.end_km - self.start_km
    }

    pub fn fuel(&self) -> f64 {
        self.fuel_quantity.unwrap_or(0.0)
    }

    /// Viaje con repostaje utilizable para cálculos de rendimiento
    pub fn is_refueling(&self) -> bool {
        self.refueling_done && self.fuel() > 0.0
    }

    /// `calculated_kmpl` sólo tiene sentido en repostajes que no son viajes cortos
    pub fn has_meaningful_kmpl(&self) -> bool {
        self.is_refueling() && !self.short_trip
    }

    /// kmpl utilizable para rachas y tendencias
    pub fn qualifying_kmpl(&self) -> Option<f64> {
        if self.short_trip {
            return None;
        }
        self.calculated_kmpl.filter(|kmpl| kmpl.is_finite() && *kmpl > 0.0)
    }

    /// Gasto total: `total_expense` si existe, si no combustible + peajes
    pub fn expense(&self) -> f64 {
        match self.total_expense {
            Some(total) => total,
            None => self.total_fuel_cost.unwrap_or(0.0) + self.total_road_expenses.unwrap_or(0.0),
        }
    }

    pub fn serial(&self) -> Option<&str> {
        self.trip_serial_number
            .as_deref()
            .map(str::trim)
            .filter(|serial| !serial.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip() -> Trip {
        Trip {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            driver_id: None,
            trip_serial_number: Some("  ".to_string()),
            trip_start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            trip_end_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            start_km: 1000.0,
            end_km: 1300.0,
            fuel_quantity: Some(20.0),
            refueling_done: true,
            calculated_kmpl: Some(15.0),
            route_deviation: None,
            gross_weight: None,
            total_expense: None,
            total_fuel_cost: Some(1800.0),
            total_road_expenses: Some(200.0),
            short_trip: false,
        }
    }

    #[test]
    fn test_expense_falls_back_to_components() {
        let mut t = trip();
        assert_eq!(t.expense(), 2000.0);
        t.total_expense = Some(2500.0);
        assert_eq!(t.expense(), 2500.0);
    }

    #[test]
    fn test_blank_serial_is_absent() {
        assert_eq!(trip().serial(), None);
    }

    #[test]
    fn test_short_trip_has_no_qualifying_kmpl() {
        let mut t = trip();
        assert_eq!(t.qualifying_kmpl(), Some(15.0));
        t.short_trip = true;
        assert_eq!(t.qualifying_kmpl(), None);
        assert!(!t.has_meaningful_kmpl());
    }
}
