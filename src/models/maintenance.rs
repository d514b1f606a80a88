//! Modelo de MaintenanceTask
//!
//! Tareas de mantenimiento con sus sub-registros de coste (`service_groups`),
//! que viven en la tabla `maintenance_service_groups` y se adjuntan al leer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Grupo de servicio con su coste
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ServiceGroup {
    pub cost: Option<f64>,
}

/// Campo del que sale el coste resuelto de una tarea
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    ServiceGroups,
    ActualCost,
    EstimatedCost,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MaintenanceTask {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub task_type: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub service_groups: Vec<ServiceGroup>,
    pub actual_cost: Option<f64>,
    pub estimated_cost: Option<f64>,
    pub downtime_days: Option<i32>,
}

impl MaintenanceTask {
    /// Coste resuelto: suma de service_groups → actual_cost → estimated_cost.
    /// Un valor nulo o cero cede el paso al siguiente.
    pub fn resolved_cost(&self) -> Option<(f64, CostSource)> {
        let groups_total: f64 = self.service_groups.iter().filter_map(|g| g.cost).sum();
        if groups_total > 0.0 {
            return Some((groups_total, CostSource::ServiceGroups));
        }
        if let Some(actual) = self.actual_cost.filter(|c| *c > 0.0) {
            return Some((actual, CostSource::ActualCost));
        }
        self.estimated_cost
            .filter(|c| *c > 0.0)
            .map(|estimated| (estimated, CostSource::EstimatedCost))
    }

    pub fn cost(&self) -> f64 {
        self.resolved_cost().map(|(cost, _)| cost).unwrap_or(0.0)
    }

    /// Averías: tareas de tipo "accidental" o "breakdown"
    pub fn is_breakdown(&self) -> bool {
        let task_type = self.task_type.trim().to_ascii_lowercase();
        task_type == "accidental" || task_type == "breakdown"
    }

    pub fn downtime(&self) -> i64 {
        self.downtime_days.map(i64::from).unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(groups: &[f64], actual: Option<f64>, estimated: Option<f64>) -> MaintenanceTask {
        MaintenanceTask {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            task_type: "Accidental".to_string(),
            service_groups: groups.iter().map(|c| ServiceGroup { cost: Some(*c) }).collect(),
            actual_cost: actual,
            estimated_cost: estimated,
            downtime_days: Some(2),
        }
    }

    #[test]
    fn test_cost_priority() {
        assert_eq!(
            task(&[3000.0, 8000.0], Some(500.0), Some(900.0)).resolved_cost(),
            Some((11000.0, CostSource::ServiceGroups))
        );
        assert_eq!(
            task(&[], Some(12000.0), Some(5000.0)).resolved_cost(),
            Some((12000.0, CostSource::ActualCost))
        );
        assert_eq!(
            task(&[], None, Some(5000.0)).resolved_cost(),
            Some((5000.0, CostSource::EstimatedCost))
        );
        assert_eq!(task(&[], None, None).resolved_cost(), None);
    }

    #[test]
    fn test_breakdown_type_is_case_insensitive() {
        assert!(task(&[], None, None).is_breakdown());
    }
}
