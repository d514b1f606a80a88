//! Modelo de Driver

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Conductor. `primary_vehicle_id` es una referencia, no propiedad.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub primary_vehicle_id: Option<Uuid>,
}
