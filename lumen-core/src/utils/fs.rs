//! Filesystem Utilities.
//!
//! Helper functions for the few filesystem operations the core layer needs,
//! integrated with the crate's error handling by returning [`CoreError`].

use crate::error::CoreError;
use std::fs;
use std::path::Path;

/// Ensures that a directory exists at the given path.
///
/// If the path does not exist, this function will attempt to create it,
/// including any necessary parent directories. If the path already exists
/// but is not a directory, an error is returned.
pub fn ensure_dir_exists(path: &Path) -> Result<(), CoreError> {
    if path.exists() {
        if !path.is_dir() {
            Err(CoreError::Filesystem {
                message: "Path exists but is not a directory".to_string(),
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "Path exists but is not a directory",
                ),
            })
        } else {
            Ok(())
        }
    } else {
        fs::create_dir_all(path).map_err(|e| CoreError::Filesystem {
            message: "Failed to create directory".to_string(),
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_ensure_dir_exists_creates_nested_directories() {
        let temp_root = tempdir().expect("Failed to create temp root dir for test");
        let nested_dir_path = temp_root.path().join("parent_dir/child_dir");

        assert!(!nested_dir_path.exists());
        let result = ensure_dir_exists(&nested_dir_path);
        assert!(result.is_ok(), "ensure_dir_exists failed: {:?}", result.err());
        assert!(nested_dir_path.is_dir(), "Nested path created is not a directory");
    }

    #[test]
    fn test_ensure_dir_exists_succeeds_if_directory_already_exists() {
        let temp_root = tempdir().expect("Failed to create temp root dir for test");
        assert!(ensure_dir_exists(temp_root.path()).is_ok());
    }

    #[test]
    fn test_ensure_dir_exists_errors_if_path_is_file() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file for test");
        writeln!(temp_file, "This is a file, not a directory.").unwrap();
        let file_path = temp_file.path().to_path_buf();

        let result = ensure_dir_exists(&file_path);
        assert!(result.is_err(), "ensure_dir_exists should have failed for a file path");

        match result.err().unwrap() {
            CoreError::Filesystem { message, path, source: _ } => {
                assert_eq!(message, "Path exists but is not a directory");
                assert_eq!(path, file_path);
            }
            other_error => panic!("Unexpected error type: {:?}", other_error),
        }
    }
}
