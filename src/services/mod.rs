//! Services module
//!
//! Este módulo contiene la lógica del motor de integridad: análisis de
//! secuencias, reglas de anomalías, ciclo de vida de alertas, escaneo
//! batch, recálculo de kmpl y métricas de conductores.

pub mod alert_service;
pub mod anomaly_rules;
pub mod mileage_service;
pub mod performance_service;
pub mod scan_service;
pub mod sequence_analyzer;

pub use alert_service::AlertService;
pub use anomaly_rules::{AnomalyRuleSet, AnomalyThresholds};
pub use mileage_service::{MileageService, RecalculationSummary};
pub use performance_service::PerformanceService;
pub use scan_service::{cancellation_channel, ScanOptions, ScanService, ScanSummary};
pub use sequence_analyzer::SequenceService;
