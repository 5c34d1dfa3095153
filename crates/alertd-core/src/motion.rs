// ── Motion alarm state machine ──
//
// Two states: inactive, or active for a scope since a timestamp. Every
// accepted event replaces the alert wholesale. A server-confirmed clear
// records a fence so that motion events already in flight when the clear
// was sent cannot resurrect the alarm. The fence and the stamps it is
// compared against both come from the hub's clock; local arrival times
// never take part, so client/hub skew cannot drop a fresh alarm.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::model::MotionAlert;

/// Owns the motion alert and the clear fence.
#[derive(Debug, Default)]
pub struct MotionMonitor {
    alert: MotionAlert,
    /// Newest hub-supplied timestamp among accepted motion events.
    last_stamp: Option<DateTime<Utc>>,
    /// Hub-clock instant of the most recent clear.
    fence: Option<DateTime<Utc>>,
}

impl MotionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current alert.
    pub fn alert(&self) -> &MotionAlert {
        &self.alert
    }

    /// Hub-clock fence left by the most recent clear, if any.
    pub fn fence(&self) -> Option<DateTime<Utc>> {
        self.fence
    }

    /// Apply a `motion` event.
    ///
    /// Returns the new alert, or `None` when the event carries its own
    /// timestamp and that timestamp is not after the clear fence.
    pub fn handle_motion(&mut self, data: &str, received_at: DateTime<Utc>) -> Option<MotionAlert> {
        let decoded = decode_motion(data);

        if let (Some(stamped), Some(fence)) = (decoded.timestamp, self.fence) {
            if stamped <= fence {
                debug!(
                    scope = %decoded.scope,
                    %stamped,
                    %fence,
                    "dropping motion event that predates the last clear"
                );
                return None;
            }
        }

        if let Some(stamped) = decoded.timestamp {
            self.last_stamp = Some(self.last_stamp.map_or(stamped, |prev| prev.max(stamped)));
        }

        self.alert = if decoded.is_active {
            MotionAlert::active(decoded.scope, decoded.timestamp.unwrap_or(received_at))
        } else {
            MotionAlert::inactive()
        };
        Some(self.alert.clone())
    }

    /// Apply an `alarmCleared` event. Always wins.
    ///
    /// The fence is the clear's own payload timestamp when it carries one,
    /// otherwise the newest stamp the hub has sent so far. Without either
    /// there is nothing on the hub's clock to compare against and no fence
    /// is set.
    pub fn handle_cleared(&mut self, data: &str) -> MotionAlert {
        let stamped = decode_clear_stamp(data).or(self.last_stamp);
        if let Some(stamped) = stamped {
            self.fence = Some(self.fence.map_or(stamped, |prev| prev.max(stamped)));
        }
        self.clear()
    }

    /// Drop the alert locally (after an acknowledgment, or on request).
    pub fn clear(&mut self) -> MotionAlert {
        self.alert = MotionAlert::inactive();
        self.alert.clone()
    }
}

// ── Payload decoding ────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
struct DecodedMotion {
    scope: String,
    is_active: bool,
    /// Timestamp carried by the payload itself, if any.
    timestamp: Option<DateTime<Utc>>,
}

/// Decode `{scope, isActive, timestamp}`; anything that is not a JSON
/// object becomes an active alert whose scope is the raw payload.
fn decode_motion(data: &str) -> DecodedMotion {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => decode_object(&map),
        _ => DecodedMotion {
            scope: data.to_owned(),
            is_active: true,
            timestamp: None,
        },
    }
}

/// Timestamp carried by an `alarmCleared` payload, when it is an object.
fn decode_clear_stamp(data: &str) -> Option<DateTime<Utc>> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => map.get("timestamp").and_then(parse_timestamp),
        _ => None,
    }
}

fn decode_object(map: &Map<String, Value>) -> DecodedMotion {
    let scope = match map.get("scope") {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };
    let is_active = map.get("isActive").and_then(Value::as_bool).unwrap_or(true);
    let timestamp = map.get("timestamp").and_then(parse_timestamp);

    DecodedMotion {
        scope,
        is_active,
        timestamp,
    }
}

/// Accepts RFC 3339, a zoneless ISO-8601 local time, or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .and_then(|naive| naive.and_local_timezone(Local).earliest())
                .map(|local| local.with_timezone(&Utc))
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn structured_payload_is_published() {
        let mut monitor = MotionMonitor::new();
        let now = at("2024-05-01T10:00:05Z");

        let alert = monitor
            .handle_motion(
                r#"{"scope":"garage","isActive":true,"timestamp":"2024-05-01T10:00:00Z"}"#,
                now,
            )
            .unwrap();

        assert_eq!(alert, MotionAlert::active("garage", at("2024-05-01T10:00:00Z")));
        assert_eq!(monitor.alert(), &alert);
    }

    #[test]
    fn plain_text_payload_becomes_scope() {
        let mut monitor = MotionMonitor::new();
        let now = at("2024-05-01T10:00:00Z");

        let alert = monitor.handle_motion("living room", now).unwrap();
        assert_eq!(alert, MotionAlert::active("living room", now));
    }

    #[test]
    fn non_object_json_keeps_raw_payload_as_scope() {
        let mut monitor = MotionMonitor::new();
        let now = at("2024-05-01T10:00:00Z");

        let alert = monitor.handle_motion("\"hall\"", now).unwrap();
        assert_eq!(alert.scope, "\"hall\"");
        assert!(alert.is_active);
    }

    #[test]
    fn missing_fields_default_to_active_now() {
        let mut monitor = MotionMonitor::new();
        let now = at("2024-05-01T10:00:00Z");

        let alert = monitor.handle_motion("{}", now).unwrap();
        assert_eq!(alert, MotionAlert::active("", now));
    }

    #[test]
    fn inactive_payload_normalises_to_inactive() {
        let mut monitor = MotionMonitor::new();
        let now = at("2024-05-01T10:00:00Z");

        monitor.handle_motion("porch", now).unwrap();
        let alert = monitor
            .handle_motion(r#"{"scope":"porch","isActive":false}"#, now)
            .unwrap();
        assert_eq!(alert, MotionAlert::inactive());
    }

    #[test]
    fn repeated_motion_republishes() {
        let mut monitor = MotionMonitor::new();
        let first = at("2024-05-01T10:00:00Z");
        let second = first + TimeDelta::seconds(3);

        monitor.handle_motion("porch", first).unwrap();
        let alert = monitor.handle_motion("porch", second).unwrap();
        assert_eq!(alert.timestamp, Some(second));
    }

    #[test]
    fn epoch_millis_timestamp() {
        let mut monitor = MotionMonitor::new();
        let alert = monitor
            .handle_motion(
                r#"{"scope":"attic","timestamp":1714557600000}"#,
                at("2024-05-01T12:00:00Z"),
            )
            .unwrap();
        assert_eq!(alert.timestamp, Some(at("2024-05-01T10:00:00Z")));
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_arrival() {
        let mut monitor = MotionMonitor::new();
        let now = at("2024-05-01T10:00:00Z");
        let alert = monitor
            .handle_motion(r#"{"scope":"attic","timestamp":"yesterday"}"#, now)
            .unwrap();
        assert_eq!(alert.timestamp, Some(now));
    }

    #[test]
    fn stamped_clear_wins_over_in_flight_motion() {
        let mut monitor = MotionMonitor::new();
        monitor
            .handle_motion(
                r#"{"scope":"garage","timestamp":"2024-05-01T10:00:00Z"}"#,
                at("2024-05-01T10:00:00Z"),
            )
            .unwrap();
        monitor.handle_cleared(r#"{"scope":"garage","timestamp":"2024-05-01T10:00:02Z"}"#);

        // Sent before the clear, processed after it.
        let in_flight = r#"{"scope":"garage","isActive":true,"timestamp":"2024-05-01T10:00:01Z"}"#;
        assert_eq!(monitor.handle_motion(in_flight, at("2024-05-01T10:00:03Z")), None);
        assert_eq!(monitor.alert(), &MotionAlert::inactive());
    }

    #[test]
    fn plain_clear_fences_at_the_retired_alarm() {
        let mut monitor = MotionMonitor::new();
        let stamped = r#"{"scope":"garage","timestamp":"2024-05-01T10:00:00Z"}"#;
        monitor.handle_motion(stamped, at("2024-05-01T10:00:00Z")).unwrap();
        monitor.handle_cleared("garage");
        assert_eq!(monitor.fence(), Some(at("2024-05-01T10:00:00Z")));

        // A replay of the retired alarm stays cleared.
        assert_eq!(monitor.handle_motion(stamped, at("2024-05-01T10:00:04Z")), None);

        let later = r#"{"scope":"garage","timestamp":"2024-05-01T10:00:01Z"}"#;
        assert!(monitor.handle_motion(later, at("2024-05-01T10:00:05Z")).is_some());
    }

    #[test]
    fn hub_clock_behind_client_does_not_drop_fresh_motion() {
        let mut monitor = MotionMonitor::new();
        let local_clear = at("2024-05-01T10:00:00Z");
        monitor.handle_motion("garage", local_clear).unwrap();
        monitor.handle_cleared("garage");

        // The hub runs five seconds behind: a fresh event sent three
        // seconds after the clear is stamped two seconds before it.
        let fresh = r#"{"scope":"garage","timestamp":"2024-05-01T09:59:58Z"}"#;
        let alert = monitor
            .handle_motion(fresh, local_clear + TimeDelta::seconds(3))
            .unwrap();
        assert!(alert.is_active);
        assert_eq!(alert.timestamp, Some(at("2024-05-01T09:59:58Z")));
    }

    #[test]
    fn motion_after_clear_is_accepted() {
        let mut monitor = MotionMonitor::new();
        monitor.handle_cleared(r#"{"timestamp":"2024-05-01T10:00:02Z"}"#);

        let fresh = r#"{"scope":"garage","timestamp":"2024-05-01T10:00:09Z"}"#;
        let alert = monitor.handle_motion(fresh, at("2024-05-01T10:00:10Z")).unwrap();
        assert!(alert.is_active);

        // Unstamped events are always accepted.
        assert!(monitor.handle_motion("garage", at("2024-05-01T10:00:11Z")).is_some());
    }

    #[test]
    fn clear_fence_never_moves_backwards() {
        let mut monitor = MotionMonitor::new();
        monitor.handle_cleared(r#"{"timestamp":"2024-05-01T10:00:05Z"}"#);
        monitor.handle_cleared(r#"{"timestamp":"2024-05-01T10:00:01Z"}"#);
        assert_eq!(monitor.fence(), Some(at("2024-05-01T10:00:05Z")));
    }

    #[test]
    fn clear_is_unconditional() {
        let mut monitor = MotionMonitor::new();
        monitor.handle_motion("porch", at("2024-05-01T10:00:00Z")).unwrap();
        let alert = monitor.handle_cleared("porch");
        assert_eq!(alert, MotionAlert::inactive());
        assert_eq!(monitor.fence(), None);
    }
}
