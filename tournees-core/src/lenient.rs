//! Forgiving deserializers for producer-supplied JSON.
//!
//! Payloads are filled in by hand or exported from spreadsheets, so any field
//! may be missing, null, or of the wrong type. None of these helpers fail:
//! unusable input becomes `None` and the model accessors apply their default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Read a number from a JSON number or a numeric string.
pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

/// Read text from a JSON string or number.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_text(value))
}

/// Read a nested object; anything that is not a JSON object is dropped.
pub(crate) fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_object(value))
}

/// Read a list of objects.
///
/// A non-array value yields `None`. Elements that are not objects are kept as
/// `T::default()` so that list lengths still reflect what the producer sent.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };

    let parsed = items
        .into_iter()
        .map(|item| coerce_object(item).unwrap_or_default())
        .collect();
    Ok(Some(parsed))
}

pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|number| number.is_finite())
}

pub(crate) fn coerce_text(value: Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Deserialize `T` from a JSON object only.
///
/// Derived structs would also accept a positional array, which is never what
/// a producer meant.
pub(crate) fn coerce_object<T: DeserializeOwned>(value: Value) -> Option<T> {
    if value.is_object() {
        serde_json::from_value(value).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_accept_numeric_strings() {
        assert_eq!(coerce_number(&json!(12)), Some(12.0));
        assert_eq!(coerce_number(&json!("12.5")), Some(12.5));
        assert_eq!(coerce_number(&json!(" 3 ")), Some(3.0));
    }

    #[test]
    fn numbers_reject_everything_else() {
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&json!([1])), None);
    }

    #[test]
    fn text_renders_numbers() {
        assert_eq!(coerce_text(json!("Lundi")), Some("Lundi".to_owned()));
        assert_eq!(coerce_text(json!(7)), Some("7".to_owned()));
        assert_eq!(coerce_text(json!({"a": 1})), None);
    }

    #[test]
    fn objects_ignore_arrays() {
        #[derive(Debug, Default, serde::Deserialize, PartialEq)]
        struct Pair {
            first: Option<u32>,
            second: Option<u32>,
        }

        assert_eq!(coerce_object::<Pair>(json!([1, 2])), None);
        assert_eq!(
            coerce_object::<Pair>(json!({"first": 1})),
            Some(Pair {
                first: Some(1),
                second: None
            })
        );
    }
}
