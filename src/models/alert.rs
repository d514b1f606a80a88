//! Modelos de Alert
//!
//! Alertas emitidas por los detectores de anomalías. El `metadata` es una
//! unión etiquetada por tipo de alerta en lugar de un mapa abierto: cada
//! detector tiene su propio struct de detalles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::models::maintenance::CostSource;

/// Tipo de alerta - mapea al ENUM alert_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "alert_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    FuelAnomaly,
    RouteDeviation,
    LowMileageStreak,
    FrequentMaintenance,
    HighExpenseSpike,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::FuelAnomaly => "fuel_anomaly",
            AlertType::RouteDeviation => "route_deviation",
            AlertType::LowMileageStreak => "low_mileage_streak",
            AlertType::FrequentMaintenance => "frequent_maintenance",
            AlertType::HighExpenseSpike => "high_expense_spike",
        }
    }
}

/// Severidad; el orden de las variantes define el orden de prioridad
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[sqlx(type_name = "alert_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Estado del ciclo de vida - `pending` es el único estado no terminal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "alert_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Accepted,
    Denied,
    Ignored,
}

impl AlertStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AlertStatus::Pending)
    }
}

/// Acción de resolución del usuario
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Accept,
    Deny,
    Ignore,
}

impl AlertAction {
    pub fn target_status(&self) -> AlertStatus {
        match self {
            AlertAction::Accept => AlertStatus::Accepted,
            AlertAction::Deny => AlertStatus::Denied,
            AlertAction::Ignore => AlertStatus::Ignored,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreDuration {
    Week,
    Permanent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "affected_entity_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Vehicle,
    Driver,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct AffectedEntity {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

impl AffectedEntity {
    pub fn vehicle(id: Uuid) -> Self {
        Self { entity_type: EntityType::Vehicle, entity_id: id }
    }
}

/// Sentido del incumplimiento de rendimiento
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MileageBreach {
    AboveMaximum,
    BelowMinimum,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelAnomalyDetails {
    pub trip_id: Uuid,
    pub trip_serial_number: Option<String>,
    pub distance_km: f64,
    pub fuel_quantity: f64,
    pub breach: MileageBreach,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteDeviationDetails {
    pub trip_id: Uuid,
    pub trip_serial_number: Option<String>,
    pub threshold_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LowMileageStreakDetails {
    pub trip_id: Uuid,
    pub streak_length: usize,
    pub streak_trip_ids: Vec<Uuid>,
    pub streak_values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrequentMaintenanceDetails {
    pub task_id: Uuid,
    pub window_days: i64,
    pub task_count: usize,
    pub related_task_ids: Vec<Uuid>,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighExpenseSpikeDetails {
    pub task_id: Uuid,
    pub task_type: String,
    pub cost_source: CostSource,
}

/// Campos específicos de cada detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertDetails {
    FuelAnomaly(FuelAnomalyDetails),
    RouteDeviation(RouteDeviationDetails),
    LowMileageStreak(LowMileageStreakDetails),
    FrequentMaintenance(FrequentMaintenanceDetails),
    HighExpenseSpike(HighExpenseSpikeDetails),
}

impl AlertDetails {
    pub fn alert_type(&self) -> AlertType {
        match self {
            AlertDetails::FuelAnomaly(_) => AlertType::FuelAnomaly,
            AlertDetails::RouteDeviation(_) => AlertType::RouteDeviation,
            AlertDetails::LowMileageStreak(_) => AlertType::LowMileageStreak,
            AlertDetails::FrequentMaintenance(_) => AlertType::FrequentMaintenance,
            AlertDetails::HighExpenseSpike(_) => AlertType::HighExpenseSpike,
        }
    }

    /// Id del registro (viaje o tarea) que disparó la alerta
    pub fn source_id(&self) -> Uuid {
        match self {
            AlertDetails::FuelAnomaly(d) => d.trip_id,
            AlertDetails::RouteDeviation(d) => d.trip_id,
            AlertDetails::LowMileageStreak(d) => d.trip_id,
            AlertDetails::FrequentMaintenance(d) => d.task_id,
            AlertDetails::HighExpenseSpike(d) => d.task_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertMetadata {
    pub expected_value: f64,
    pub actual_value: f64,
    /// Porcentaje relativo al umbral incumplido
    pub deviation: f64,
    pub recommendations: Vec<String>,
    pub details: AlertDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_duration: Option<IgnoreDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl AlertMetadata {
    pub fn new(
        expected_value: f64,
        actual_value: f64,
        deviation: f64,
        recommendations: Vec<String>,
        details: AlertDetails,
    ) -> Self {
        Self {
            expected_value,
            actual_value,
            deviation,
            recommendations,
            details,
            resolution_reason: None,
            resolution_comment: None,
            ignore_duration: None,
            resolved_at: None,
        }
    }
}

/// Alerta persistida
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub status: AlertStatus,
    pub title: String,
    pub description: String,
    #[sqlx(flatten)]
    pub affected_entity: AffectedEntity,
    #[sqlx(json)]
    pub metadata: AlertMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn source_id(&self) -> Uuid {
        self.metadata.details.source_id()
    }
}

/// Alerta producida por un detector, aún sin id
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub affected_entity: AffectedEntity,
    pub metadata: AlertMetadata,
}

impl NewAlert {
    pub fn source_id(&self) -> Uuid {
        self.metadata.details.source_id()
    }

    /// Materializa la alerta en estado `pending`
    pub fn into_alert(self, id: Uuid, now: DateTime<Utc>) -> Alert {
        Alert {
            id,
            alert_type: self.alert_type,
            severity: self.severity,
            status: AlertStatus::Pending,
            title: self.title,
            description: self.description,
            affected_entity: self.affected_entity,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filtros para el listado de alertas
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilters {
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub severity: Option<Severity>,
    pub vehicle_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl AlertFilters {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 500;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.status.map_or(true, |s| alert.status == s)
            && self.alert_type.map_or(true, |t| alert.alert_type == t)
            && self.severity.map_or(true, |s| alert.severity == s)
            && self.vehicle_id.map_or(true, |id| {
                alert.affected_entity.entity_type == EntityType::Vehicle
                    && alert.affected_entity.entity_id == id
            })
    }
}
