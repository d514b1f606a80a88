//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle que consume el motor de integridad.
//! Mapea a la tabla `vehicles`; los costes de documentos "otros" viven en
//! una columna JSONB.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Active,
    Maintenance,
    OutOfService,
    Retired,
}

/// Coste de un documento adicional (licencias locales, pases, etc.)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentCost {
    pub name: String,
    pub cost: Option<f64>,
}

/// Vehicle principal
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub registration_number: String,
    pub current_odometer: f64,
    pub status: VehicleStatus,
    pub insurance_cost: Option<f64>,
    pub fitness_cost: Option<f64>,
    pub permit_cost: Option<f64>,
    pub puc_cost: Option<f64>,
    pub tax_cost: Option<f64>,
    #[sqlx(json)]
    pub other_documents: Vec<DocumentCost>,
}

impl Vehicle {
    pub fn is_active(&self) -> bool {
        self.status != VehicleStatus::Retired
    }

    /// Gasto de documentación: seguro, fitness, permiso, PUC, impuestos y otros
    pub fn documentation_expense(&self) -> f64 {
        let fixed = [
            self.insurance_cost,
            self.fitness_cost,
            self.permit_cost,
            self.puc_cost,
            self.tax_cost,
        ]
        .iter()
        .flatten()
        .sum::<f64>();

        let others = self
            .other_documents
            .iter()
            .filter_map(|doc| doc.cost)
            .sum::<f64>();

        fixed + others
    }
}
