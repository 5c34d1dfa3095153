// ── Temperature payload parsing ──
//
// Sensor firmware sends readings as bare numbers, small JSON objects, or
// human-readable text. Extraction never fails loudly: `None` is the only
// failure signal, and callers treat it as "no reading".

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Object keys tried, in priority order, when the payload is JSON.
const VALUE_FIELDS: [&str; 3] = ["temp", "temperature", "value"];

/// First signed integer or decimal in free text.
static NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").ok());

/// Extract a temperature from an already-decoded JSON value.
///
/// Numbers pass through unchanged and `null` is absent. Anything else is
/// rendered as text and handed to [`parse_temperature_text`].
pub fn parse_temperature(raw: &Value) -> Option<f64> {
    match raw {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_temperature_text(s),
        other => parse_temperature_text(&other.to_string()),
    }
}

/// Extract a temperature from a raw event payload.
///
/// Tries a JSON object carrying `temp`, `temperature` or `value` first,
/// then falls back to the first number found anywhere in the text.
pub fn parse_temperature_text(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        let field = VALUE_FIELDS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_f64));
        if field.is_some() {
            return field;
        }
    }

    first_number(text)
}

fn first_number(text: &str) -> Option<f64> {
    let regex = NUMBER.as_ref()?;
    let found = regex.find(text)?;
    found
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
