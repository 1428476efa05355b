//! Shared pieces of the per-card configuration builders.
//!
//! Every card deserializes its raw JSON into a `#[serde(default)]` struct and
//! then validates it. The helpers here cover the loose typing the dashboard
//! hands over: empty strings mean "not set", and ranges must not be empty.

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::error::ConfigError;

/// Deserializes a string field, treating `""` and `null` as absent.
pub fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Parses `raw` into `T`, rejecting anything that is not a JSON object.
pub fn parse<T: DeserializeOwned>(raw: &Value) -> Result<T, ConfigError> {
    if !raw.is_object() {
        return Err(ConfigError::Malformed(format!(
            "expected an object, got {}",
            kind(raw)
        )));
    }
    Ok(serde_json::from_value(raw.clone())?)
}

pub fn require(value: &Option<String>, field: &'static str) -> Result<(), ConfigError> {
    match value {
        Some(_) => Ok(()),
        None => Err(ConfigError::MissingField(field)),
    }
}

pub fn check_range(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { field, min, max })
    }
}

/// Like [`check_range`], also capping the width of the range.
pub fn check_span(field: &'static str, min: f64, max: f64, limit: f64) -> Result<(), ConfigError> {
    check_range(field, min, max)?;
    if max - min <= limit {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { field, min, max })
    }
}

pub fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not positive")))
    }
}

fn kind(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Probe {
        #[serde(deserialize_with = "non_empty")]
        entity: Option<String>,
        max: f64,
    }

    #[test]
    fn empty_strings_are_absent() {
        let probe: Probe = parse(&json!({ "entity": "  ", "max": 3.0 })).unwrap();
        assert_eq!(probe.entity, None);
        assert_eq!(probe.max, 3.0);
    }

    #[test]
    fn non_objects_are_malformed() {
        let err = parse::<Probe>(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn spans_are_capped() {
        assert!(check_span("temp", -20.0, 40.0, 400.0).is_ok());
        assert!(check_span("temp", -300.0, 300.0, 400.0).is_err());
        assert!(check_span("temp", 40.0, -20.0, 400.0).is_err());
    }

    #[test]
    fn ranges_must_be_increasing() {
        assert!(check_range("temp", -10.0, 40.0).is_ok());
        assert_eq!(
            check_range("temp", 5.0, 5.0),
            Err(ConfigError::InvalidRange {
                field: "temp",
                min: 5.0,
                max: 5.0
            })
        );
    }
}
