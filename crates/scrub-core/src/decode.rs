//! Field decoder and validator
//!
//! Turns a record's raw target field into a typed [`DecodedField`] and
//! classifies the record as clean, malformed, or needing a rewrite.
//! Decoding never falls back to a default value: a field that is not a
//! JSON object is a [`DecodeError`].

use crate::error::DecodeError;
use crate::policy::AllowedKeySet;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// A single decoded value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// JSON `null`
    Null,
    /// JSON boolean
    Bool(bool),
    /// JSON number
    Number(Number),
    /// JSON string
    String(String),
    /// Array or object nested under a key
    Nested(Value),
}

impl FieldValue {
    /// Whether the value is "unset" under truthiness rules
    ///
    /// `null`, `false`, any zero and the empty string are falsy.
    #[must_use]
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
            Self::String(s) => s.is_empty(),
            Self::Nested(_) => false,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Nested(nested),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Parsed target field: a flat mapping from key to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedField {
    entries: Map<String, Value>,
}

impl DecodedField {
    /// Value under `key`, if present
    #[must_use]
    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.entries.get(key).cloned().map(FieldValue::from)
    }

    /// Iterate over all keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys that are not members of `allowed`
    pub fn extra_keys<'a>(&'a self, allowed: &'a AllowedKeySet) -> impl Iterator<Item = &'a str> {
        self.keys().filter(move |key| !allowed.contains(key))
    }
}

/// Outcome of inspecting one record
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Every key is already allowed; no update
    Clean,
    /// Field cannot be decoded; skipped and reported
    Malformed(DecodeError),
    /// At least one key falls outside the allow-list
    NeedsRewrite(DecodedField),
}

/// Decode a raw target field
///
/// # Errors
/// - `DecodeError::MalformedSyntax` if `raw` is not JSON
/// - `DecodeError::NotAnObject` if `raw` is JSON but not an object
pub fn decode(raw: &str) -> Result<DecodedField, DecodeError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(entries) => Ok(DecodedField { entries }),
        other => Err(DecodeError::NotAnObject {
            found: json_type_name(&other),
        }),
    }
}

/// Decode and classify a raw target field against an allow-list
#[must_use]
pub fn classify(raw: &str, allowed: &AllowedKeySet) -> Classification {
    match decode(raw) {
        Err(err) => Classification::Malformed(err),
        Ok(decoded) if decoded.extra_keys(allowed).next().is_none() => Classification::Clean,
        Ok(decoded) => Classification::NeedsRewrite(decoded),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> AllowedKeySet {
        AllowedKeySet::default()
    }

    #[test]
    fn decodes_flat_object() {
        let decoded = decode(r#"{"country":"US","ip":"1.2.3.4","latitude":40.1}"#).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.get("country"), Some(FieldValue::from("US")));
        assert!(matches!(decoded.get("latitude"), Some(FieldValue::Number(_))));
        assert_eq!(decoded.get("region"), None);
    }

    #[test]
    fn rejects_invalid_syntax() {
        let err = decode("not-json").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedSyntax { .. }));

        let err = decode(r#"{"country":"US""#).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedSyntax { .. }));
    }

    #[test]
    fn rejects_non_objects() {
        for (raw, found) in [
            ("null", "null"),
            ("5", "number"),
            ("\"US\"", "string"),
            ("[1,2]", "array"),
            ("true", "boolean"),
        ] {
            assert_eq!(decode(raw).unwrap_err(), DecodeError::NotAnObject { found });
        }
    }

    #[test]
    fn classifies_clean_records() {
        assert_eq!(
            classify(r#"{"country":"FR","country_code":"FR","region":"EU"}"#, &allowed()),
            Classification::Clean
        );
        // Subsets and degenerate values are still clean.
        assert_eq!(classify(r#"{"country":""}"#, &allowed()), Classification::Clean);
        assert_eq!(classify("{}", &allowed()), Classification::Clean);
    }

    #[test]
    fn classifies_records_needing_rewrite() {
        let classification = classify(r#"{"country":"US","ip":"1.2.3.4"}"#, &allowed());
        let Classification::NeedsRewrite(decoded) = classification else {
            panic!("expected rewrite, got {classification:?}");
        };
        let allowed = allowed();
        let extra: Vec<_> = decoded.extra_keys(&allowed).collect();
        assert_eq!(extra, vec!["ip"]);
    }

    #[test]
    fn classifies_malformed_records() {
        assert!(matches!(
            classify("not-json", &allowed()),
            Classification::Malformed(DecodeError::MalformedSyntax { .. })
        ));
        assert!(matches!(
            classify("null", &allowed()),
            Classification::Malformed(DecodeError::NotAnObject { found: "null" })
        ));
    }

    #[test]
    fn falsy_values() {
        assert!(FieldValue::Null.is_falsy());
        assert!(FieldValue::Bool(false).is_falsy());
        assert!(FieldValue::from(Value::from(0)).is_falsy());
        assert!(FieldValue::from(Value::from(0.0)).is_falsy());
        assert!(FieldValue::from("").is_falsy());

        assert!(!FieldValue::Bool(true).is_falsy());
        assert!(!FieldValue::from(Value::from(7)).is_falsy());
        assert!(!FieldValue::from("US").is_falsy());
        assert!(!FieldValue::Nested(Value::Array(vec![])).is_falsy());
    }
}
