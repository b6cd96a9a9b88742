//! Loader configuration.

use std::path::Path;

use radscene_math::Tolerance;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Tunables for a scene load.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Lines (ingestor) or records (parser) between cancellation polls.
    pub poll_interval: usize,
    /// Number of raw records buffered between ingestor and parser.
    pub queue_capacity: usize,
    /// Substring marking a header as an external reference.
    pub reference_marker: String,
    /// Distance below which two points are the same point.
    pub linear_tolerance: f64,
    /// Allowed out-of-plane deviation, relative to a boundary's extent.
    pub planarity_tolerance: f64,
    /// Resolve a modifier through a material's type name when no material
    /// carries that name.
    pub resolve_by_type_alias: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: 10,
            queue_capacity: 64,
            reference_marker: "!".to_string(),
            linear_tolerance: 1e-6,
            planarity_tolerance: 1e-4,
            resolve_by_type_alias: true,
        }
    }
}

impl LoaderConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, LoadError> {
        let config: LoaderConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a TOML file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.poll_interval == 0 {
            return Err(LoadError::config("poll_interval must be positive"));
        }
        if self.queue_capacity == 0 {
            return Err(LoadError::config("queue_capacity must be positive"));
        }
        if self.reference_marker.trim().is_empty() {
            return Err(LoadError::config("reference_marker must not be empty"));
        }
        if !(self.linear_tolerance > 0.0) {
            return Err(LoadError::config("linear_tolerance must be positive"));
        }
        if !(self.planarity_tolerance > 0.0) {
            return Err(LoadError::config("planarity_tolerance must be positive"));
        }
        Ok(())
    }

    /// Geometric tolerance derived from this configuration.
    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.linear_tolerance, self.planarity_tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, 10);
        assert_eq!(config.reference_marker, "!");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = "poll_interval = 3\nreference_marker = \"xform\"\n";
        let config = LoaderConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.poll_interval, 3);
        assert_eq!(config.reference_marker, "xform");
        assert_eq!(config.queue_capacity, 64);
        assert!(config.resolve_by_type_alias);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = LoaderConfig::from_toml_str("poll_interval = 0").unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));

        let err = LoaderConfig::from_toml_str("linear_tolerance = -1.0").unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }

    #[test]
    fn test_bad_syntax() {
        let err = LoaderConfig::from_toml_str("poll_interval = \"ten\"").unwrap_err();
        assert!(matches!(err, LoadError::ConfigSyntax(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = LoaderConfig::from_file("/nonexistent/radscene.toml").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
