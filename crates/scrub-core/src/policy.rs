//! Transform policy
//!
//! Projects a decoded field onto the allow-list. The projection always
//! carries exactly the allowed keys: missing keys become `null` and every
//! other key is dropped unconditionally. Values are never copied from a
//! dropped key into an allowed one.
//!
//! Serialization follows the allow-list declaration order, so the same
//! input always produces the same bytes.

use crate::decode::{DecodedField, FieldValue};
use crate::error::ConfigError;
use indexmap::IndexSet;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Keys that may survive a rewrite, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AllowedKeySet {
    keys: IndexSet<String>,
}

impl AllowedKeySet {
    /// Create an allow-list; duplicates keep their first position
    ///
    /// # Errors
    /// `ConfigError::EmptyAllowList` if no key is given
    pub fn new<I, K>(keys: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: IndexSet<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }
        Ok(Self { keys })
    }

    /// Membership test
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Keys in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Number of allowed keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; an allow-list cannot be constructed empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for AllowedKeySet {
    fn default() -> Self {
        Self {
            keys: ["country", "country_code", "region"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl TryFrom<Vec<String>> for AllowedKeySet {
    type Error = ConfigError;

    fn try_from(keys: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(keys)
    }
}

impl From<AllowedKeySet> for Vec<String> {
    fn from(set: AllowedKeySet) -> Self {
        set.keys.into_iter().collect()
    }
}

/// How degenerate values under allowed keys are carried over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalsyCoercion {
    /// `""`, `0`, `false` and `null` are all written as `null`
    #[default]
    CollapseToNull,
    /// Present values are copied as-is; only absent keys become `null`
    Preserve,
}

/// Allow-list projection rules
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformPolicy {
    allowed: AllowedKeySet,
    coercion: FalsyCoercion,
}

impl TransformPolicy {
    /// Create a policy
    #[inline]
    #[must_use]
    pub fn new(allowed: AllowedKeySet, coercion: FalsyCoercion) -> Self {
        Self { allowed, coercion }
    }

    /// The allow-list
    #[inline]
    #[must_use]
    pub fn allowed(&self) -> &AllowedKeySet {
        &self.allowed
    }

    /// The coercion rule
    #[inline]
    #[must_use]
    pub fn coercion(&self) -> FalsyCoercion {
        self.coercion
    }

    /// Whether `decoded` already satisfies the allow-list
    #[must_use]
    pub fn is_clean(&self, decoded: &DecodedField) -> bool {
        decoded.extra_keys(&self.allowed).next().is_none()
    }

    /// Project `decoded` onto exactly the allowed keys
    #[must_use]
    pub fn project(&self, decoded: &DecodedField) -> ProjectedField {
        let entries = self
            .allowed
            .iter()
            .map(|key| {
                let value = match decoded.get(key) {
                    None => FieldValue::Null,
                    Some(value) if self.coercion == FalsyCoercion::CollapseToNull && value.is_falsy() => {
                        FieldValue::Null
                    }
                    Some(value) => value,
                };
                (key.to_string(), value)
            })
            .collect();
        ProjectedField { entries }
    }
}

/// Minimized field containing exactly the allowed keys
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedField {
    entries: Vec<(String, FieldValue)>,
}

impl ProjectedField {
    /// Value under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Keys in output order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Canonical serialization for storage
    ///
    /// # Errors
    /// Propagates serializer failures; none occur for values produced by
    /// [`crate::decode::decode`].
    pub fn to_raw(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for ProjectedField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    fn project(raw: &str, coercion: FalsyCoercion) -> String {
        let policy = TransformPolicy::new(AllowedKeySet::default(), coercion);
        policy.project(&decode(raw).unwrap()).to_raw().unwrap()
    }

    #[test]
    fn drops_extra_keys_and_fills_missing() {
        assert_eq!(
            project(r#"{"country":"US","ip":"1.2.3.4"}"#, FalsyCoercion::CollapseToNull),
            r#"{"country":"US","country_code":null,"region":null}"#
        );
    }

    #[test]
    fn output_follows_declaration_order() {
        let allowed = AllowedKeySet::new(["region", "country"]).unwrap();
        let policy = TransformPolicy::new(allowed, FalsyCoercion::CollapseToNull);
        let raw = policy
            .project(&decode(r#"{"country":"US","region":"NA","asn":1}"#).unwrap())
            .to_raw()
            .unwrap();
        assert_eq!(raw, r#"{"region":"NA","country":"US"}"#);
    }

    #[test]
    fn collapse_to_null_coerces_degenerate_values() {
        assert_eq!(
            project(
                r#"{"country":"","country_code":0,"region":false,"ip":"x"}"#,
                FalsyCoercion::CollapseToNull
            ),
            r#"{"country":null,"country_code":null,"region":null}"#
        );
    }

    #[test]
    fn preserve_keeps_degenerate_values() {
        assert_eq!(
            project(
                r#"{"country":"","country_code":0,"region":false,"ip":"x"}"#,
                FalsyCoercion::Preserve
            ),
            r#"{"country":"","country_code":0,"region":false}"#
        );
    }

    #[test]
    fn allow_list_rejects_empty() {
        assert!(matches!(
            AllowedKeySet::new(Vec::<String>::new()),
            Err(ConfigError::EmptyAllowList)
        ));
    }

    #[test]
    fn allow_list_dedups() {
        let allowed = AllowedKeySet::new(["a", "b", "a"]).unwrap();
        assert_eq!(allowed.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn is_clean_matches_classification() {
        let policy = TransformPolicy::default();
        assert!(policy.is_clean(&decode(r#"{"country":"US"}"#).unwrap()));
        assert!(!policy.is_clean(&decode(r#"{"country":"US","city":"NYC"}"#).unwrap()));
    }
}
