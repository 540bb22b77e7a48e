//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::paths::{config_path, default_tests_dir};
use super::Result;
use crate::client::Flavor;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Test selection settings
    #[serde(default)]
    pub run: RunConfig,

    /// Service client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Extra or overriding HTTP endpoints, keyed by operation name
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointConfig>,
}

/// Test selection settings
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Root directory of the downloaded test corpus
    #[serde(default = "default_tests_dir")]
    pub tests_path: PathBuf,

    /// Patterns of test files to exclude
    #[serde(default)]
    pub skip: Vec<String>,

    /// Force the deployment flavor instead of asking the client
    pub flavor: Option<Flavor>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tests_path: default_tests_dir(),
            skip: Vec::new(),
            flavor: None,
        }
    }
}

/// Service client settings
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the service
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// API key sent as `Authorization: ApiKey <key>`
    pub api_key: Option<String>,

    /// Basic auth user name
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<String>,

    /// Whether the service is a serverless deployment
    #[serde(default)]
    pub serverless: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
            api_key: None,
            username: None,
            password: None,
            serverless: false,
        }
    }
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// HTTP mapping for one operation
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EndpointConfig {
    /// HTTP method (GET, PUT, POST, DELETE, HEAD)
    pub method: String,

    /// Path templates with `{param}` placeholders, most specific first
    pub paths: Vec<String>,

    /// Whether the operation answers with a plain boolean (HEAD-style)
    #[serde(default)]
    pub boolean: bool,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Flavor forced by the environment or the config file
    ///
    /// `TEST_SUITE` wins over `run.flavor`.
    pub fn flavor_override(&self) -> Option<Flavor> {
        std::env::var("TEST_SUITE")
            .ok()
            .and_then(|suite| suite.parse().ok())
            .or(self.run.flavor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.client.url, "http://localhost:9200");
        assert_eq!(config.client.timeout_secs, 30);
        assert!(config.run.skip.is_empty());
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [run]
            tests_path = "/srv/tests"
            skip = ["cat\\..*", "ml/"]
            flavor = "serverless"

            [client]
            url = "https://example.test:443"
            api_key = "abc"

            [endpoints."indices.exists_alias"]
            method = "HEAD"
            paths = ["/_alias/{name}", "/{index}/_alias/{name}"]
            boolean = true
            "#,
        )
        .unwrap();

        assert_eq!(config.run.tests_path, PathBuf::from("/srv/tests"));
        assert_eq!(config.run.skip.len(), 2);
        assert_eq!(config.run.flavor, Some(Flavor::Serverless));
        assert_eq!(config.client.api_key.as_deref(), Some("abc"));
        let endpoint = &config.endpoints["indices.exists_alias"];
        assert_eq!(endpoint.method, "HEAD");
        assert!(endpoint.boolean);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = Config::parse("[client]\nurl = 3").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }
}
