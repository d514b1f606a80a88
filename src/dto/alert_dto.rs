use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{AlertAction, DateRange, IgnoreDuration};

// Request de resolución de una alerta
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AlertActionRequest {
    pub action: AlertAction,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
    pub duration: Option<IgnoreDuration>,
}

impl AlertActionRequest {
    /// Motivo recortado; una cadena vacía cuenta como ausente
    pub fn reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

// Query `?start=YYYY-MM-DD&end=YYYY-MM-DD`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl From<DateRangeQuery> for DateRange {
    fn from(query: DateRangeQuery) -> Self {
        DateRange::new(query.start, query.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_request_parsing() {
        let request: AlertActionRequest = serde_json::from_value(json!({
            "action": "ignore",
            "reason": "  seasonal route  ",
            "duration": "permanent"
        }))
        .unwrap();
        assert_eq!(request.action, AlertAction::Ignore);
        assert_eq!(request.duration, Some(IgnoreDuration::Permanent));
        assert_eq!(request.reason().as_deref(), Some("seasonal route"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_overlong_reason_is_rejected() {
        let request = AlertActionRequest {
            action: AlertAction::Deny,
            reason: Some("x".repeat(1001)),
            duration: None,
        };
        assert!(request.validate().is_err());
    }
}
