//! Inbound reading validation.
//!
//! Validation inspects the raw JSON object directly rather than relying on
//! serde deserialization, so that every violated constraint can be collected
//! and reported at once instead of failing on the first bad field.

use serde_json::Value;

use crate::reading::RawReading;

/// Numeric fields every inbound reading must carry.
const NUMERIC_FIELDS: &[&str] = &[
    "temperature",
    "humidity",
    "busVoltage",
    "current",
    "power",
    "lightValue",
    "windCount",
    "hour",
];

/// Inclusive plausibility bounds per field: (name, min, max).
const RANGES: &[(&str, f64, f64)] = &[
    ("temperature", -50.0, 100.0),
    ("humidity", 0.0, 100.0),
    ("lightValue", 0.0, 4095.0),
    ("windCount", 0.0, 10_000.0),
    ("busVoltage", 0.0, 20.0),
    ("hour", 0.0, 23.0),
];

/// A rejected reading, carrying every violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid reading: {}", self.violations.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Validate a raw inbound reading.
///
/// Checks, in order: the value is a JSON object; each required field is
/// present and non-null; each numeric field is a finite number and
/// `lightStatus` is textual; each range constraint holds. Range checks run
/// independently of type checks so a caller sees every problem at once.
/// Unknown extra fields (e.g. `deviceId`) are ignored.
pub fn validate(raw: &Value) -> Result<RawReading, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError {
            violations: vec!["reading must be a JSON object".to_string()],
        });
    };

    let mut violations = Vec::new();

    for &field in NUMERIC_FIELDS {
        match obj.get(field) {
            None | Some(Value::Null) => violations.push(format!("{field} is required")),
            Some(v) => match v.as_f64() {
                Some(n) if n.is_finite() => {}
                _ => violations.push(format!("{field} must be a number")),
            },
        }
    }

    match obj.get("lightStatus") {
        None | Some(Value::Null) => violations.push("lightStatus is required".to_string()),
        Some(Value::String(_)) => {}
        Some(_) => violations.push("lightStatus must be a string".to_string()),
    }

    for &(field, min, max) in RANGES {
        if let Some(n) = num(obj, field)
            && !(min..=max).contains(&n)
        {
            violations.push(format!("{field} must be between {min} and {max}"));
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    // All fields verified present and in range above.
    Ok(RawReading {
        temperature: num(obj, "temperature").unwrap_or_default(),
        humidity: num(obj, "humidity").unwrap_or_default(),
        bus_voltage: num(obj, "busVoltage").unwrap_or_default(),
        current: num(obj, "current").unwrap_or_default(),
        power: num(obj, "power").unwrap_or_default(),
        light_value: num(obj, "lightValue").unwrap_or_default(),
        light_status: obj
            .get("lightStatus")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        wind_count: num(obj, "windCount").unwrap_or_default(),
        hour: num(obj, "hour").unwrap_or_default() as u8,
    })
}

fn num(obj: &serde_json::Map<String, Value>, field: &str) -> Option<f64> {
    obj.get(field).and_then(Value::as_f64).filter(|n| n.is_finite())
}
