//! Modelos del análisis de secuencias de serie
//!
//! Resultados derivados, no persistidos.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::alert::Severity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SequenceIssueType {
    Gap,
    Duplicate,
}

/// Viaje que comparte número de serie con otros
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuplicateTrip {
    pub trip_id: Uuid,
    pub trip_start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequenceIssue {
    pub issue_type: SequenceIssueType,
    /// Gap: series a ambos lados del hueco. Duplicate: la serie repetida.
    pub serial_numbers: Vec<String>,
    pub severity: Severity,
    pub description: String,
    /// Mes `YYYY-MM` del grupo (sólo gaps)
    pub month: Option<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub missing_count: u64,
    pub missing_serials: Vec<String>,
    pub duplicate_trips: Vec<DuplicateTrip>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequenceAnalysis {
    pub vehicle_id: Uuid,
    pub registration_number: String,
    pub total_trips: usize,
    /// Indicador aproximado de completitud; no condiciona otra lógica
    pub expected_sequence_length: u64,
    pub actual_sequence_length: usize,
    pub gap_count: usize,
    pub missing_serial_count: u64,
    pub duplicate_count: usize,
    pub issues: Vec<SequenceIssue>,
}

impl SequenceAnalysis {
    pub fn empty(vehicle_id: Uuid, registration_number: &str) -> Self {
        Self {
            vehicle_id,
            registration_number: registration_number.to_string(),
            total_trips: 0,
            expected_sequence_length: 0,
            actual_sequence_length: 0,
            gap_count: 0,
            missing_serial_count: 0,
            duplicate_count: 0,
            issues: Vec::new(),
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuesBySeverity {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl IssuesBySeverity {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

/// Informe de secuencias de toda la flota
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemSequenceReport {
    pub total_vehicles_checked: usize,
    pub vehicles_with_issues: usize,
    pub total_issues: usize,
    pub issues_by_severity: IssuesBySeverity,
    /// Sólo vehículos con incidencias
    pub vehicle_analyses: Vec<SequenceAnalysis>,
}
