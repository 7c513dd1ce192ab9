//! Default configuration values for Lumen Core.
//!
//! These functions are used by `serde`'s `default` attribute in the
//! configuration structures to provide sensible default values when they
//! are not specified in the configuration file.

use std::path::PathBuf;

/// Returns the default log level string (`"info"`).
pub(super) fn default_log_level() -> String {
    "info".to_string()
}

/// Returns the default log file path (`None`).
pub(super) fn default_log_file_path() -> Option<PathBuf> {
    None // No log file by default
}

/// Returns the default log format string (`"text"`).
pub(super) fn default_log_format() -> String {
    "text".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_default_log_file_path() {
        assert_eq!(default_log_file_path(), None);
    }

    #[test]
    fn test_default_log_format() {
        assert_eq!(default_log_format(), "text");
    }
}
