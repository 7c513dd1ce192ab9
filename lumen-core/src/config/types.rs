//! Configuration Data Structures for Lumen Core.
//!
//! This module defines the primary structures used to represent the
//! configuration of the Lumen core system. These structs are typically
//! populated by deserializing a TOML configuration file.
//!
//! They utilize `serde` for deserialization, apply default values for
//! fields not present in the configuration source (see
//! [`super::defaults`]), and reject unknown fields via
//! `#[serde(deny_unknown_fields)]`.

use super::defaults;
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration settings for the logging subsystem.
///
/// Defines the log level, an optional log file path, and the log format.
/// These settings are consumed by [`crate::logging`] when initializing the
/// global logger.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// The minimum log level to record.
    /// Valid values (case-insensitive): "trace", "debug", "info", "warn",
    /// "error". Defaults to "info".
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
    /// Optional path to a file where logs should be written.
    /// If `None`, file logging is disabled.
    #[serde(default = "defaults::default_log_file_path")]
    pub file_path: Option<PathBuf>,
    /// The format for log messages written to a file.
    /// Valid values (case-insensitive): "text", "json". Defaults to "text".
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::default_log_level(),
            file_path: defaults::default_log_file_path(),
            format: defaults::default_log_format(),
        }
    }
}

/// Root configuration structure for the Lumen core system.
///
/// Aggregates all core configuration settings. Designed to be deserialized
/// from a TOML file, with defaults for missing sections or fields.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// Configuration for the logging subsystem.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_logging_config_default_values() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.file_path, None);
        assert_eq!(config.format, "text");
    }

    #[test]
    fn test_logging_config_deserialize_partial() {
        let json = r#"{"level": "debug"}"#;
        let config: LoggingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.file_path, None);
        assert_eq!(config.format, "text");

        let json_with_path = r#"{"file_path": "/var/log/lumen.log"}"#;
        let config_with_path: LoggingConfig = serde_json::from_str(json_with_path).unwrap();
        assert_eq!(
            config_with_path.file_path,
            Some(PathBuf::from("/var/log/lumen.log"))
        );
    }

    #[test]
    fn test_core_config_deserialize_with_logging() {
        let toml_str = r#"
            [logging]
            level = "warn"
            format = "json"
        "#;
        let config: CoreConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.file_path, None);
    }

    #[test]
    fn test_core_config_deserialize_empty() {
        let config: CoreConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    #[should_panic] // deny_unknown_fields
    fn test_logging_config_deserialize_unknown_field() {
        let json = r#"{"level": "info", "unknown_field": "value"}"#;
        let _config: LoggingConfig = serde_json::from_str(json).unwrap();
    }
}
