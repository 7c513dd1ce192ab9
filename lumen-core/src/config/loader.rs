//! Configuration Loading for Lumen Core.
//!
//! This module provides the [`ConfigLoader`] struct, which is responsible
//! for loading, parsing, and validating the [`CoreConfig`]. The embedder
//! hands in an explicit path; if no file exists there, the default
//! configuration is used.

use std::fs;
use std::path::Path;

use crate::config::CoreConfig;
use crate::error::{ConfigError, CoreError};

/// Valid log level names accepted by [`ConfigLoader::validate`].
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Valid file log formats accepted by [`ConfigLoader::validate`].
const VALID_LOG_FORMATS: [&str; 2] = ["text", "json"];

/// `ConfigLoader` provides static methods to load and validate
/// [`CoreConfig`].
///
/// This is an empty struct used as a namespace for configuration loading
/// logic.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates the configuration from `path`.
    ///
    /// - If the file is missing, a default `CoreConfig` is returned (missing
    ///   configuration is not an error).
    /// - Other read errors map to [`ConfigError::ReadError`], parse errors
    ///   to [`ConfigError::ParseError`], and invalid values to
    ///   [`ConfigError::ValidationError`].
    pub fn load_from_path(path: &Path) -> Result<CoreConfig, CoreError> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str::<CoreConfig>(&content)
                .map_err(|e| CoreError::Config(ConfigError::ParseError(e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CoreConfig::default(),
            Err(e) => {
                return Err(CoreError::Config(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                }));
            }
        };

        Self::validate(&mut config)?;
        Ok(config)
    }

    /// Normalizes and validates a loaded configuration in place.
    ///
    /// Log level and format strings are lowercased; unknown values are a
    /// [`ConfigError::ValidationError`].
    pub fn validate(config: &mut CoreConfig) -> Result<(), CoreError> {
        let level = config.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(CoreError::Config(ConfigError::ValidationError(format!(
                "unknown log level '{}'",
                config.logging.level
            ))));
        }
        config.logging.level = level;

        let format = config.logging.format.to_lowercase();
        if !VALID_LOG_FORMATS.contains(&format.as_str()) {
            return Err(CoreError::Config(ConfigError::ValidationError(format!(
                "unknown log format '{}'",
                config.logging.format
            ))));
        }
        config.logging.format = format;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ConfigLoader::load_from_path(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [logging]
            level = "DEBUG"
            format = "json"
            "#,
        );
        let config = ConfigLoader::load_from_path(&path).unwrap();
        // Levels are normalized to lowercase.
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "this is not toml = = =");
        let err = ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_unknown_level_is_validation_error() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [logging]
            level = "verbose"
            "#,
        );
        let err = ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::ValidationError(_))
        ));
    }
}
