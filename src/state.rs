//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::cache::InsightCache;
use crate::config::environment::EnvironmentConfig;
use crate::repositories::FleetStore;
use crate::services::{
    AlertService, AnomalyRuleSet, AnomalyThresholds, MileageService, PerformanceService,
    ScanService, SequenceService,
};
use crate::utils::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn FleetStore>,
    pub alerts: AlertService,
    pub scans: ScanService,
    pub sequences: SequenceService,
    pub mileage: MileageService,
    pub performance: PerformanceService,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, store: Arc<dyn FleetStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_thresholds(config, store, clock, AnomalyThresholds::default())
    }

    pub fn with_thresholds(
        config: EnvironmentConfig,
        store: Arc<dyn FleetStore>,
        clock: Arc<dyn Clock>,
        thresholds: AnomalyThresholds,
    ) -> Self {
        let alerts = AlertService::new(Arc::clone(&store), Arc::clone(&clock));
        let scans = ScanService::new(
            Arc::clone(&store),
            alerts.clone(),
            AnomalyRuleSet::new(thresholds),
            config.scan_options(),
        );
        let cache = InsightCache::new(config.insight_cache_config(), clock);

        Self {
            sequences: SequenceService::new(Arc::clone(&store)),
            mileage: MileageService::new(Arc::clone(&store), cache.clone()),
            performance: PerformanceService::new(Arc::clone(&store), cache),
            alerts,
            scans,
            store,
            config,
        }
    }
}
