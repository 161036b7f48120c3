//! Scrub configuration
//!
//! Loaded from TOML; every field has a default matching the reference
//! geolocation instance:
//!
//! ```toml
//! allowed_keys = ["country", "country_code", "region"]
//! batch_size = 1000
//! page_size = 1000
//! falsy_coercion = "collapse_to_null"
//! ```

use crate::error::ConfigError;
use crate::policy::{AllowedKeySet, FalsyCoercion, TransformPolicy};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Default number of updates per batch
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Default number of records per scan page
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = DEFAULT_BATCH_SIZE;

/// Scrub configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrubConfig {
    /// Keys that survive a rewrite
    pub allowed_keys: AllowedKeySet,
    /// Maximum updates committed together
    pub batch_size: NonZeroUsize,
    /// Records fetched per scan page
    pub page_size: NonZeroUsize,
    /// Handling of `""`, `0`, `false` under allowed keys
    pub falsy_coercion: FalsyCoercion,
}

impl ScrubConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With allow-list
    #[inline]
    #[must_use]
    pub fn with_allowed_keys(mut self, allowed_keys: AllowedKeySet) -> Self {
        self.allowed_keys = allowed_keys;
        self
    }

    /// With batch size
    #[inline]
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// With scan page size
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    /// With falsy coercion rule
    #[inline]
    #[must_use]
    pub fn with_falsy_coercion(mut self, falsy_coercion: FalsyCoercion) -> Self {
        self.falsy_coercion = falsy_coercion;
        self
    }

    /// Transform policy described by this configuration
    #[must_use]
    pub fn policy(&self) -> TransformPolicy {
        TransformPolicy::new(self.allowed_keys.clone(), self.falsy_coercion)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` for invalid TOML, unknown keys, a zero size, or
    /// an empty allow-list
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`ScrubConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            allowed_keys: AllowedKeySet::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            falsy_coercion: FalsyCoercion::default(),
        }
    }
}

/// Convert a raw size into a `NonZeroUsize`
///
/// # Errors
/// `ConfigError::ZeroSize` naming `field` when `value` is zero
pub fn non_zero(field: &'static str, value: usize) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(value).ok_or(ConfigError::ZeroSize { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_instance() {
        let config = ScrubConfig::new();
        assert_eq!(config.batch_size.get(), 1000);
        assert_eq!(config.page_size.get(), 1000);
        assert_eq!(config.falsy_coercion, FalsyCoercion::CollapseToNull);
        assert_eq!(
            config.allowed_keys.iter().collect::<Vec<_>>(),
            vec!["country", "country_code", "region"]
        );
    }

    #[test]
    fn parses_partial_toml() {
        let config = ScrubConfig::from_toml_str(
            r#"
            allowed_keys = ["country"]
            batch_size = 50
            falsy_coercion = "preserve"
            "#,
        )
        .unwrap();
        assert_eq!(config.batch_size.get(), 50);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.falsy_coercion, FalsyCoercion::Preserve);
        assert_eq!(config.allowed_keys.len(), 1);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            ScrubConfig::from_toml_str("batch_size = 0"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ScrubConfig::from_toml_str("allowed_keys = []"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ScrubConfig::from_toml_str("unknown = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size = 10").unwrap();
        let config = ScrubConfig::load(file.path()).unwrap();
        assert_eq!(config.page_size.get(), 10);

        assert!(matches!(
            ScrubConfig::load(file.path().with_extension("missing")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn builder_methods() {
        let config = ScrubConfig::new()
            .with_batch_size(non_zero("batch_size", 7).unwrap())
            .with_falsy_coercion(FalsyCoercion::Preserve);
        assert_eq!(config.batch_size.get(), 7);
        assert_eq!(config.policy().coercion(), FalsyCoercion::Preserve);
        assert!(matches!(
            non_zero("page_size", 0),
            Err(ConfigError::ZeroSize { field: "page_size" })
        ));
    }
}
