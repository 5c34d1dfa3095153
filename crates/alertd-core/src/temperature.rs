// ── Temperature alarm state machine ──
//
// Holds the alert, the suppression window and the acknowledgment fence
// together so one lock covers every read-modify-write. Readings above the
// threshold pass through three gates (fence, suppression, already active)
// before they may raise a new alarm; every gate still records the value.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{SuppressionState, TemperatureAlert};
use crate::parse::parse_temperature_text;

/// Default alarm threshold in degrees.
pub const DEFAULT_THRESHOLD: f64 = 30.0;

/// What a temperature-domain event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TemperatureOutcome {
    /// A new alarm became active.
    Raised,
    /// Only the displayed reading changed.
    Updated,
    /// Above threshold, but not after the last acknowledged alarm.
    Fenced,
    /// Above threshold during a suppression window.
    Suppressed,
    /// Above threshold while an alarm is already showing.
    AlreadyActive,
    /// Alarm and suppression reset by the hub.
    Cleared,
    /// Suppression lifted.
    Resumed,
}

/// Owns the temperature alert, suppression and acknowledgment fence.
#[derive(Debug)]
pub struct TemperatureMonitor {
    threshold: f64,
    alert: TemperatureAlert,
    suppression: SuppressionState,
    /// Bumped on every acknowledgment; lets a pending auto-resume notice
    /// it has been superseded.
    ack_epoch: u64,
}

impl TemperatureMonitor {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            alert: TemperatureAlert::default(),
            suppression: SuppressionState::default(),
            ack_epoch: 0,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn alert(&self) -> &TemperatureAlert {
        &self.alert
    }

    pub fn suppression(&self) -> SuppressionState {
        self.suppression
    }

    pub fn ack_epoch(&self) -> u64 {
        self.ack_epoch
    }

    // ── Stream events ───────────────────────────────────────────────

    /// Apply a `temperature` or `tempAlarm` payload received at `received_at`.
    pub fn handle_reading(&mut self, data: &str, received_at: DateTime<Utc>) -> TemperatureOutcome {
        let Some(value) = parse_temperature_text(data) else {
            debug!(payload = data, "temperature payload carried no reading");
            self.alert.temp = None;
            return TemperatureOutcome::Updated;
        };
        self.handle_value(value, received_at)
    }

    /// Apply an already-parsed reading.
    pub fn handle_value(&mut self, value: f64, received_at: DateTime<Utc>) -> TemperatureOutcome {
        self.alert.temp = Some(value);

        if value <= self.threshold {
            return TemperatureOutcome::Updated;
        }

        if self
            .suppression
            .last_acknowledged
            .is_some_and(|acked| received_at <= acked)
        {
            return TemperatureOutcome::Fenced;
        }
        if self.suppression.suppressed {
            return TemperatureOutcome::Suppressed;
        }
        if self.alert.is_active {
            return TemperatureOutcome::AlreadyActive;
        }

        self.alert = TemperatureAlert::active(value, received_at);
        TemperatureOutcome::Raised
    }

    /// Apply `tempCleared`: full reset, suppression lifted.
    pub fn handle_cleared(&mut self) -> TemperatureOutcome {
        self.alert = TemperatureAlert::default();
        self.suppression.suppressed = false;
        TemperatureOutcome::Cleared
    }

    /// Apply `tempResume`, or record a successful resume command.
    pub fn handle_resume(&mut self) -> TemperatureOutcome {
        self.suppression.suppressed = false;
        TemperatureOutcome::Resumed
    }

    // ── Local commands ──────────────────────────────────────────────

    /// Enter suppression and fence at the current alarm.
    ///
    /// The fence is the active alarm's timestamp, or `now` when none is
    /// showing, and never moves backwards. The displayed alarm is dropped
    /// but the last reading is kept. Returns the new acknowledgment epoch.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> u64 {
        let fence = self.alert.timestamp.unwrap_or(now);
        self.suppression.suppressed = true;
        self.suppression.last_acknowledged = Some(
            self.suppression
                .last_acknowledged
                .map_or(fence, |prev| prev.max(fence)),
        );

        self.alert.is_active = false;
        self.alert.timestamp = None;

        self.ack_epoch += 1;
        self.ack_epoch
    }

    /// Whether an auto-resume scheduled at `epoch` should still fire.
    pub fn resume_pending(&self, epoch: u64) -> bool {
        self.suppression.suppressed && self.ack_epoch == epoch
    }

    /// Lift suppression only if the acknowledgment at `epoch` is still the
    /// latest one. Returns whether suppression was lifted.
    pub fn resume_if(&mut self, epoch: u64) -> bool {
        if !self.resume_pending(epoch) {
            return false;
        }
        self.handle_resume();
        true
    }

    /// Raise an alarm immediately, bypassing every gate.
    pub fn force_alarm(&mut self, temp: f64, now: DateTime<Utc>) {
        self.alert = TemperatureAlert::active(temp, now);
    }
}

impl Default for TemperatureMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_714_557_600, 0).unwrap_or_default()
    }

    fn secs(n: i64) -> DateTime<Utc> {
        t0() + TimeDelta::seconds(n)
    }

    #[test]
    fn below_threshold_never_activates() {
        let mut monitor = TemperatureMonitor::new(30.0);
        for (n, payload) in (0_i64..).zip(["12", "29.9", "30", r#"{"temp": 30.0}"#]) {
            let outcome = monitor.handle_reading(payload, secs(n));
            assert_eq!(outcome, TemperatureOutcome::Updated);
            assert!(!monitor.alert().is_active);
        }
        assert_eq!(monitor.alert().temp, Some(30.0));
    }

    #[test]
    fn below_threshold_does_not_heal_active_alarm() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.handle_reading("35", secs(0));
        assert_eq!(monitor.handle_reading("21", secs(1)), TemperatureOutcome::Updated);

        let alert = monitor.alert();
        assert!(alert.is_active);
        assert_eq!(alert.temp, Some(21.0));
        assert_eq!(alert.timestamp, Some(secs(0)));
    }

    #[test]
    fn only_first_alarm_transitions_while_active() {
        let mut monitor = TemperatureMonitor::new(30.0);

        assert_eq!(monitor.handle_reading("31", secs(0)), TemperatureOutcome::Raised);
        assert_eq!(
            monitor.handle_reading("33", secs(1)),
            TemperatureOutcome::AlreadyActive
        );
        assert_eq!(
            monitor.handle_reading("40", secs(2)),
            TemperatureOutcome::AlreadyActive
        );

        let alert = monitor.alert();
        assert_eq!(alert.temp, Some(40.0));
        assert_eq!(alert.timestamp, Some(secs(0)));
    }

    #[test]
    fn unparseable_reading_only_blanks_temp() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.handle_reading("35", secs(0));

        assert_eq!(monitor.handle_reading("n/a", secs(1)), TemperatureOutcome::Updated);
        let alert = monitor.alert();
        assert!(alert.is_active);
        assert_eq!(alert.temp, None);
        assert_eq!(alert.timestamp, Some(secs(0)));
    }

    #[test]
    fn acknowledge_suppresses_and_fences() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.handle_reading("32", secs(0));

        let epoch = monitor.acknowledge(secs(1));
        assert_eq!(epoch, 1);

        let suppression = monitor.suppression();
        assert!(suppression.suppressed);
        assert_eq!(suppression.last_acknowledged, Some(secs(0)));

        let alert = monitor.alert();
        assert!(!alert.is_active);
        assert_eq!(alert.temp, Some(32.0));
        assert_eq!(alert.timestamp, None);
    }

    #[test]
    fn acknowledge_without_alarm_fences_at_now() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.acknowledge(secs(7));
        assert_eq!(monitor.suppression().last_acknowledged, Some(secs(7)));
    }

    #[test]
    fn fence_holds_even_when_unsuppressed() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.acknowledge(secs(10));
        monitor.handle_resume();
        assert!(!monitor.suppression().suppressed);

        assert_eq!(monitor.handle_reading("45", secs(5)), TemperatureOutcome::Fenced);
        assert_eq!(monitor.handle_reading("45", secs(10)), TemperatureOutcome::Fenced);
        assert!(!monitor.alert().is_active);
        assert_eq!(monitor.alert().temp, Some(45.0));

        assert_eq!(monitor.handle_reading("45", secs(11)), TemperatureOutcome::Raised);
    }

    #[test]
    fn fence_takes_priority_over_suppression() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.acknowledge(secs(10));
        assert_eq!(monitor.handle_reading("45", secs(3)), TemperatureOutcome::Fenced);
        assert_eq!(monitor.handle_reading("45", secs(12)), TemperatureOutcome::Suppressed);
    }

    #[test]
    fn fence_never_moves_backwards() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.acknowledge(secs(20));
        monitor.acknowledge(secs(5));
        assert_eq!(monitor.suppression().last_acknowledged, Some(secs(20)));
        assert_eq!(monitor.ack_epoch(), 2);
    }

    #[test]
    fn cleared_is_terminal_reset() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.handle_reading("50", secs(0));
        monitor.acknowledge(secs(1));

        for _ in 0..2 {
            assert_eq!(monitor.handle_cleared(), TemperatureOutcome::Cleared);
            assert_eq!(monitor.alert(), &TemperatureAlert::default());
            assert!(!monitor.suppression().suppressed);
        }
    }

    #[test]
    fn resume_leaves_alert_untouched() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.handle_reading("50", secs(0));
        monitor.acknowledge(secs(1));
        monitor.handle_reading("51", secs(2));

        assert_eq!(monitor.handle_resume(), TemperatureOutcome::Resumed);
        assert!(!monitor.suppression().suppressed);
        assert_eq!(monitor.alert().temp, Some(51.0));
        assert!(!monitor.alert().is_active);
    }

    #[test]
    fn resume_pending_tracks_epoch_and_suppression() {
        let mut monitor = TemperatureMonitor::new(30.0);
        let first = monitor.acknowledge(secs(1));
        assert!(monitor.resume_pending(first));

        let second = monitor.acknowledge(secs(2));
        assert!(!monitor.resume_pending(first));
        assert!(monitor.resume_pending(second));

        monitor.handle_resume();
        assert!(!monitor.resume_pending(second));
    }

    #[test]
    fn resume_if_ignores_superseded_epochs() {
        let mut monitor = TemperatureMonitor::new(30.0);
        let first = monitor.acknowledge(secs(1));
        let second = monitor.acknowledge(secs(2));

        assert!(!monitor.resume_if(first));
        assert!(monitor.suppression().suppressed);

        assert!(monitor.resume_if(second));
        assert!(!monitor.suppression().suppressed);
        assert!(!monitor.resume_if(second));
    }

    #[test]
    fn threshold_scenario() {
        let mut monitor = TemperatureMonitor::new(30.0);

        assert_eq!(monitor.handle_reading("32", secs(0)), TemperatureOutcome::Raised);
        assert_eq!(monitor.alert().temp, Some(32.0));

        monitor.acknowledge(secs(0));
        assert!(monitor.suppression().suppressed);

        assert_eq!(monitor.handle_reading("33", secs(1)), TemperatureOutcome::Suppressed);
        assert!(!monitor.alert().is_active);
        assert_eq!(monitor.alert().temp, Some(33.0));

        // Auto-resume
        monitor.handle_resume();

        assert_eq!(monitor.handle_reading("34", secs(6)), TemperatureOutcome::Raised);
        assert!(monitor.alert().is_active);
        assert_eq!(monitor.alert().temp, Some(34.0));
    }

    #[test]
    fn force_alarm_bypasses_gates() {
        let mut monitor = TemperatureMonitor::new(30.0);
        monitor.acknowledge(secs(100));
        monitor.force_alarm(36.0, secs(1));
        assert_eq!(monitor.alert(), &TemperatureAlert::active(36.0, secs(1)));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(TemperatureOutcome::AlreadyActive.to_string(), "already_active");
    }
}
