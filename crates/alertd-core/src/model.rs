// ── Published alert state ──
//
// Snapshots handed to subscribers. Each value is replaced wholesale on
// every accepted transition, never mutated in place by consumers.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use alertd_api::ConnectionStatus;

/// Motion alarm for a single zone.
///
/// Inactive alerts always carry an empty scope and no timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionAlert {
    pub is_active: bool,
    /// Zone label supplied by the hub.
    pub scope: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MotionAlert {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn active(scope: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            is_active: true,
            scope: scope.into(),
            timestamp: Some(timestamp),
        }
    }
}

/// Temperature alarm plus the latest reading.
///
/// `temp` is kept while idle so the last reading stays visible;
/// `timestamp` is only set while the alarm is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureAlert {
    pub is_active: bool,
    pub temp: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl TemperatureAlert {
    pub fn active(temp: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            is_active: true,
            temp: Some(temp),
            timestamp: Some(timestamp),
        }
    }
}

/// Operator-requested silence for temperature alarms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressionState {
    /// Above-threshold readings update `temp` but never raise an alarm.
    pub suppressed: bool,
    /// Alarms arriving at or before this instant are fenced out.
    /// Never moves backwards.
    pub last_acknowledged: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn inactive_motion_has_no_scope_or_timestamp() {
        let alert = MotionAlert::inactive();
        assert!(!alert.is_active);
        assert!(alert.scope.is_empty());
        assert!(alert.timestamp.is_none());
    }

    #[test]
    fn serializes_camel_case() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let value = serde_json::to_value(TemperatureAlert::active(31.5, ts)).unwrap();
        assert_eq!(
            value,
            json!({ "isActive": true, "temp": 31.5, "timestamp": "2024-05-01T10:00:00Z" })
        );

        let value = serde_json::to_value(SuppressionState::default()).unwrap();
        assert_eq!(value, json!({ "suppressed": false, "lastAcknowledged": null }));
    }
}
