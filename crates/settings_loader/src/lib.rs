//! # Settings Loader
//!
//! Centralized loading of `settings.json` for the sales dashboard. The file
//! carries the monthly revenue target, per-funnel target overrides, the chart
//! palette, which date marks a deal as closed, and logging options. Every key
//! is optional; missing keys fall back to the defaults in [`models::Settings`].
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/settings.json")?;
//!
//! // Load optional settings (returns None if no path is given)
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_optional_settings(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::Settings;

pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    tracing::debug!(path = %path.display(), version = settings.settings_version, "settings loaded");
    Ok(settings)
}

/// Loads settings from the default location (settings.json in the current directory)
pub fn load_default_settings() -> Result<Settings> {
    load_settings(DEFAULT_SETTINGS_PATH)
}

/// Loads settings from an optional path, returning None if no path is provided
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Option<Settings>> {
    match path {
        Some(settings_path) => Ok(Some(load_settings(settings_path)?)),
        None => Ok(None),
    }
}

/// Tries the provided path, then the default location. Falls back to built-in
/// defaults when neither file is usable.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Settings {
    if let Some(settings_path) = path {
        match load_settings(settings_path) {
            Ok(settings) => return settings,
            Err(e) => tracing::warn!("{:#}; trying {}", e, DEFAULT_SETTINGS_PATH),
        }
    }

    if settings_file_exists(DEFAULT_SETTINGS_PATH) {
        match load_default_settings() {
            Ok(settings) => return settings,
            Err(e) => tracing::warn!("{:#}; using built-in defaults", e),
        }
    }

    Settings::default()
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::DateField;
    use std::io::Write;

    fn write_settings(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_settings_reads_overrides() {
        let file = write_settings(
            r##"{
                "settings_version": 2,
                "target_per_funnel": 450000,
                "funnel_targets": { "Transportes": 800000 },
                "palette": ["#000000"],
                "date_field": "previsao_fechamento",
                "logging": { "level": "debug", "format": "json" }
            }"##,
        );

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.settings_version, 2);
        assert_eq!(settings.target_per_funnel, 450_000.0);
        assert_eq!(settings.funnel_targets.get("Transportes"), Some(&800_000.0));
        assert_eq!(settings.palette, vec!["#000000".to_string()]);
        assert_eq!(settings.date_field, DateField::ExpectedCloseDate);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_load_settings_partial_file_uses_defaults() {
        let file = write_settings(r#"{ "target_per_funnel": 100 }"#);
        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.target_per_funnel, 100.0);
        assert_eq!(settings.palette, models::default_palette());
        assert!(settings.funnel_targets.is_empty());
    }

    #[test]
    fn test_malformed_settings_error_names_file() {
        let file = write_settings("{ not json");
        let err = load_settings(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Parsing settings JSON"));
    }

    #[test]
    fn test_optional_settings_none_without_path() {
        assert!(load_optional_settings(None).unwrap().is_none());
    }

    #[test]
    fn test_fallback_to_defaults_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let settings = load_settings_with_fallback(Some(&missing));
        // the default location may exist in the working directory, so only
        // check that something usable came back
        assert!(settings.target_per_funnel > 0.0);
    }

    #[test]
    fn test_settings_file_exists() {
        let file = write_settings("{}");
        assert!(settings_file_exists(file.path()));
        let dir = tempfile::tempdir().unwrap();
        assert!(!settings_file_exists(dir.path()));
    }
}
