// ── Event categories ──
//
// Maps SSE event names onto the handler that owns them. Names the engine
// does not recognise are dropped before any state is touched.

use std::str::FromStr;

/// A recognised alert event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum AlertEventKind {
    /// Motion detected or updated in a zone.
    Motion,
    /// The hub cleared the motion alarm.
    AlarmCleared,
    /// Periodic temperature reading.
    Temperature,
    /// The hub flagged an alarm-level temperature.
    TempAlarm,
    /// The hub cleared the temperature alarm and any suppression.
    TempCleared,
    /// The hub lifted temperature suppression.
    TempResume,
}

impl AlertEventKind {
    /// Look up a category by its SSE event name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }
}
