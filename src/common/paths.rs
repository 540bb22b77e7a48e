//! Configuration and data paths
//!
//! Linux: `$XDG_CONFIG_HOME/api-conformance` and `$XDG_DATA_HOME/api-conformance`
//! macOS/Windows: the platform equivalents from the `directories` crate

use std::path::PathBuf;

/// Name used for the configuration and data directories
const APP_NAME: &str = "api-conformance";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the configuration file path
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Get the default directory the test corpus is downloaded into
///
/// Falls back to `./tmp` when no data directory can be determined.
pub fn default_tests_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("tests"))
        .unwrap_or_else(|| PathBuf::from("tmp"))
}

/// Short identifier for a test file: `<parent dir>/<file name>`
pub fn test_identifier(path: &std::path::Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path
        .parent()
        .and_then(|p| p.file_name())
        .map(|p| p.to_string_lossy())
    {
        Some(parent) => format!("{}/{}", parent, file),
        None => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_identifier_keeps_parent_dir() {
        let id = test_identifier(Path::new("/tmp/tests/indices.create/10_basic.yml"));
        assert_eq!(id, "indices.create/10_basic.yml");
    }

    #[test]
    fn test_identifier_without_parent() {
        assert_eq!(test_identifier(Path::new("basic.yml")), "basic.yml");
    }
}
