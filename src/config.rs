// src/config.rs
// Tool-level defaults and their overrides (JSON file, then environment)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::exceptions::{PathContext, Result, TransplantError};

// =================================
// Defaults
// =================================
pub const DEFAULT_MARKER_CLASS: &str = "GFxMovieInfo";
pub const DEFAULT_PAYLOAD_EXTENSION: &str = "swf";
pub const DEFAULT_PACKAGE_EXTENSION: &str = "pcc";
pub const DEFAULT_BACKUP_SUFFIX: &str = "bak";

// =================================
// Environment overrides
// =================================
pub const WORKERS_ENV: &str = "TRANSPLANTER_WORKERS";
pub const MARKER_CLASS_ENV: &str = "TRANSPLANTER_MARKER_CLASS";

/// Settings shared by every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransplantConfig {
    /// Class name of payload-bearing exports
    pub marker_class: String,
    /// Extension of extracted/candidate payload files, without the dot
    pub payload_extension: String,
    /// Extension of package files searched in folders
    pub package_extension: String,
    /// Suffix appended to the destination when backing it up
    pub backup_suffix: String,
    /// Upper bound on packages processed at once in folder operations
    pub workers: usize,
}

impl Default for TransplantConfig {
    fn default() -> Self {
        TransplantConfig {
            marker_class: DEFAULT_MARKER_CLASS.to_string(),
            payload_extension: DEFAULT_PAYLOAD_EXTENSION.to_string(),
            package_extension: DEFAULT_PACKAGE_EXTENSION.to_string(),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl TransplantConfig {
    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_path(path)?;
        let config: TransplantConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(WORKERS_ENV) {
            match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.workers = n,
                _ => log::warn!("Ignoring {WORKERS_ENV}={value:?}: expected a positive integer"),
            }
        }
        if let Some(value) = lookup(MARKER_CLASS_ENV) {
            if !value.is_empty() {
                self.marker_class = value;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TransplantError::Generic(
                "workers must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("marker_class", &self.marker_class),
            ("payload_extension", &self.payload_extension),
            ("package_extension", &self.package_extension),
            ("backup_suffix", &self.backup_suffix),
        ] {
            if value.is_empty() {
                return Err(TransplantError::Generic(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = TransplantConfig::default();
        assert_eq!(config.marker_class, "GFxMovieInfo");
        assert_eq!(config.payload_extension, "swf");
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("transplanter.json");
        std::fs::write(&path, r#"{ "workers": 3, "backup_suffix": "orig" }"#).unwrap();

        let config = TransplantConfig::from_file(&path).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.backup_suffix, "orig");
        assert_eq!(config.package_extension, "pcc");
    }

    #[test]
    fn test_invalid_json_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, r#"{ "workers": 0 }"#).unwrap();
        assert!(TransplantConfig::from_file(&path).is_err());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            TransplantConfig::from_file(&path),
            Err(TransplantError::JsonError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = TransplantConfig::default().with_env_from(|key| match key {
            WORKERS_ENV => Some("6".to_string()),
            MARKER_CLASS_ENV => Some("GFxMovie".to_string()),
            _ => None,
        });
        assert_eq!(config.workers, 6);
        assert_eq!(config.marker_class, "GFxMovie");

        let base = TransplantConfig::default();
        let ignored = base.clone().with_env_from(|_| Some("zero".to_string()));
        assert_eq!(ignored.workers, base.workers);
    }
}
