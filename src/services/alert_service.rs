//! Alert Lifecycle Manager
//!
//! Crea alertas (con de-duplicación por registro origen) y aplica las
//! acciones de resolución `accept` / `deny` / `ignore`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    Alert, AlertAction, AlertFilters, AlertStatus, AlertType, IgnoreDuration, NewAlert,
};
use crate::repositories::FleetStore;
use crate::utils::clock::Clock;
use crate::utils::errors::{AppError, AppResult};

/// Duración de la supresión para alertas ignoradas "por una semana"
pub const IGNORE_WEEK_DAYS: i64 = 7;

/// ¿Impide `existing` crear una alerta nueva para el mismo origen?
pub fn suppresses_new_alert(existing: &Alert, now: DateTime<Utc>) -> bool {
    match existing.status {
        AlertStatus::Pending | AlertStatus::Accepted | AlertStatus::Denied => true,
        AlertStatus::Ignored => match existing.metadata.ignore_duration {
            Some(IgnoreDuration::Permanent) => true,
            Some(IgnoreDuration::Week) | None => {
                let since = existing.metadata.resolved_at.unwrap_or(existing.updated_at);
                now < since + Duration::days(IGNORE_WEEK_DAYS)
            }
        },
    }
}

/// Aplica una acción de resolución sobre una copia de la alerta.
/// No valida el estado previo: una segunda acción sobrescribe a la primera.
pub fn apply_action(
    alert: &Alert,
    action: AlertAction,
    reason: Option<String>,
    duration: Option<IgnoreDuration>,
    now: DateTime<Utc>,
) -> Alert {
    let mut updated = alert.clone();
    updated.status = action.target_status();
    updated.metadata.resolution_reason = reason.clone();
    updated.metadata.resolution_comment = reason;
    updated.metadata.ignore_duration = match action {
        AlertAction::Ignore => Some(duration.unwrap_or(IgnoreDuration::Week)),
        _ => None,
    };
    updated.metadata.resolved_at = Some(now);
    updated.updated_at = now;
    updated
}

type SourceKey = (AlertType, Uuid);

#[derive(Clone)]
pub struct AlertService {
    store: Arc<dyn FleetStore>,
    clock: Arc<dyn Clock>,
    // Serializa consulta + inserción por (tipo, registro origen)
    source_locks: Arc<Mutex<HashMap<SourceKey, Arc<Mutex<()>>>>>,
}

impl AlertService {
    pub fn new(store: Arc<dyn FleetStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            source_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock_for(&self, key: SourceKey) -> Arc<Mutex<()>> {
        let mut locks = self.source_locks.lock().await;
        Arc::clone(locks.entry(key).or_default())
    }

    async fn release(&self, key: SourceKey, lock: Arc<Mutex<()>>) {
        let mut locks = self.source_locks.lock().await;
        // El mapa y `lock` son las únicas referencias: nadie más espera
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&key);
        }
    }

    /// Persiste la alerta salvo que exista otra activa o suprimida para el
    /// mismo (tipo, registro origen). Devuelve `None` si se descarta.
    pub async fn create_alert(&self, alert: NewAlert) -> AppResult<Option<Alert>> {
        let key = (alert.alert_type, alert.source_id());
        let lock = self.lock_for(key).await;
        let result = {
            let _guard = lock.lock().await;
            self.create_alert_locked(alert).await
        };
        self.release(key, lock).await;
        result
    }

    async fn create_alert_locked(&self, alert: NewAlert) -> AppResult<Option<Alert>> {
        let source_id = alert.source_id();
        if let Some(existing) = self
            .store
            .find_alert_for_source(alert.alert_type, source_id)
            .await?
        {
            if suppresses_new_alert(&existing, self.clock.now()) {
                debug!(
                    "🔁 Alerta {} para {} ya existe ({:?}), se omite",
                    alert.alert_type.as_str(),
                    source_id,
                    existing.status
                );
                return Ok(None);
            }
        }

        let alert_type = alert.alert_type;
        let Some(created) = self.store.insert_alert(alert).await? else {
            debug!(
                "🔁 Alerta {} para {} ya pendiente en el store, se omite",
                alert_type.as_str(),
                source_id
            );
            return Ok(None);
        };
        info!(
            "🚨 Alerta creada: {} [{:?}] {} ({})",
            created.alert_type.as_str(),
            created.severity,
            created.title,
            created.id
        );
        Ok(Some(created))
    }

    /// Resolución de una alerta por el usuario. Los fallos se propagan.
    pub async fn process_alert_action(
        &self,
        alert_id: Uuid,
        action: AlertAction,
        reason: Option<String>,
        duration: Option<IgnoreDuration>,
    ) -> AppResult<Alert> {
        let alert = self
            .store
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", alert_id)))?;

        if alert.status.is_terminal() {
            warn!(
                "⚠️ Alerta {} ya resuelta como {:?}, se sobrescribe con {:?}",
                alert_id, alert.status, action
            );
        }
        if duration.is_some() && action != AlertAction::Ignore {
            debug!("ignore_duration descartado para la acción {:?}", action);
        }

        let updated = apply_action(&alert, action, reason, duration, self.clock.now());
        let saved = self.store.update_alert(&updated).await?;
        info!("✅ Alerta {} → {:?}", saved.id, saved.status);
        Ok(saved)
    }

    pub async fn list_alerts(&self, filters: &AlertFilters) -> AppResult<Vec<Alert>> {
        self.store.list_alerts(filters).await
    }
}
