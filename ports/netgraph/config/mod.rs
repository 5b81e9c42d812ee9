/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Configuration for the topology viewer.
//!
//! Layers, lowest precedence first: built-in defaults, `config.toml` in the
//! config directory (or an explicit path), environment variables, then
//! command-line flags. `ViewerConfig::resolve` stacks them in that order.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reconcile::LayoutBounds;

pub const ENV_API_ENDPOINT: &str = "NETGRAPH_API_ENDPOINT";
pub const ENV_POLL_INTERVAL_MS: &str = "NETGRAPH_POLL_INTERVAL_MS";

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8080";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Get the config directory for netgraph
pub fn config_dir() -> PathBuf {
    if let Some(config_home) = dirs::config_dir() {
        config_home.join("netgraph")
    } else {
        PathBuf::from(".netgraph")
    }
}

/// Viewer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Base URL of the topology API (default: http://localhost:8080)
    pub api_endpoint: String,

    /// Path of the node list below the endpoint (default: /api/nodes)
    pub nodes_path: String,

    /// Time between snapshot fetches (default: 5000)
    pub poll_interval_ms: u64,

    /// Give up on a single fetch after this long (default: 3000)
    pub request_timeout_ms: u64,

    /// Region new nodes are scattered into
    pub layout: LayoutBounds,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            nodes_path: "/api/nodes".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: 3000,
            layout: LayoutBounds::default(),
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub api_endpoint: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

impl ViewerConfig {
    /// Stack every layer using the process environment, then validate
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(path, |key| std::env::var(key).ok(), overrides)
    }

    /// Stack every layer using an arbitrary variable lookup, then validate.
    ///
    /// With no explicit path the default location is used if it exists.
    pub fn resolve_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_with(lookup)?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit TOML file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
    }

    /// Override from an arbitrary variable lookup
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(endpoint) = lookup(ENV_API_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.api_endpoint = endpoint.trim().to_string();
        }
        if let Some(interval) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = interval.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_POLL_INTERVAL_MS} is not a number: {interval}"))
            })?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(endpoint) = &overrides.api_endpoint {
            self.api_endpoint = endpoint.clone();
        }
        if let Some(interval_ms) = overrides.poll_interval_ms {
            self.poll_interval_ms = interval_ms;
        }
    }

    /// Reject settings the poll loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.api_endpoint)
            .map_err(|e| ConfigError::Invalid(format!("api_endpoint {}: {e}", self.api_endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "api_endpoint must be http(s), got {}",
                url.scheme()
            )));
        }
        if !self.nodes_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "nodes_path must start with '/': {}",
                self.nodes_path
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.layout.min <= self.layout.max) {
            return Err(ConfigError::Invalid(format!(
                "layout bounds are reversed: {} > {}",
                self.layout.min, self.layout.max
            )));
        }
        Ok(())
    }

    /// Full URL of the node list
    pub fn nodes_url(&self) -> String {
        format!("{}{}", self.api_endpoint.trim_end_matches('/'), self.nodes_path)
    }

    /// Full URL of one node's detail
    pub fn node_detail_url(&self, id: crate::snapshot::NodeId) -> String {
        format!("{}/{id}", self.nodes_url())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Get the path to the config file
    fn config_path() -> PathBuf {
        config_dir().join("config.toml")
    }
}

/// Errors from loading or validating configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "Parse error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.nodes_url(), "http://localhost:8080/api/nodes");
        assert_eq!(config.poll_interval(), Duration::from_millis(5000));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_endpoint = \"http://collector:9090/\"\nnodes_path = \"/nodes\"\n\n[layout]\nmin = 0.0\nmax = 1000.0\n",
        )
        .unwrap();

        let config = ViewerConfig::load_from(&path).unwrap();
        assert_eq!(config.nodes_url(), "http://collector:9090/nodes");
        assert_eq!(config.node_detail_url(4), "http://collector:9090/nodes/4");
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.layout.max, 1000.0);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();
        assert!(matches!(ViewerConfig::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(ViewerConfig::load_from(&missing), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ViewerConfig::default();
        config
            .apply_env_with(env(&[
                (ENV_API_ENDPOINT, " http://10.1.1.1:8080 "),
                (ENV_POLL_INTERVAL_MS, "250"),
            ]))
            .unwrap();
        assert_eq!(config.api_endpoint, "http://10.1.1.1:8080");
        assert_eq!(config.poll_interval_ms, 250);
    }

    #[test]
    fn test_env_blank_endpoint_ignored() {
        let mut config = ViewerConfig::default();
        config.apply_env_with(env(&[(ENV_API_ENDPOINT, "  ")])).unwrap();
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_env_bad_interval_rejected() {
        let mut config = ViewerConfig::default();
        let result = config.apply_env_with(env(&[(ENV_POLL_INTERVAL_MS, "fast")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ViewerConfig::default();
        config.api_endpoint = "ftp://host".to_string();
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.nodes_path = "api/nodes".to_string();
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.layout = LayoutBounds { min: 10.0, max: 1.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layers_stack_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_endpoint = \"http://file:1000\"\npoll_interval_ms = 1000\nrequest_timeout_ms = 900\n",
        )
        .unwrap();

        // File beats defaults.
        let none = ConfigOverrides::default();
        let config = ViewerConfig::resolve_with(Some(&path), env(&[]), &none).unwrap();
        assert_eq!(config.api_endpoint, "http://file:1000");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.nodes_path, "/api/nodes");

        // Environment beats file.
        let vars = [
            (ENV_API_ENDPOINT, "http://env:2000"),
            (ENV_POLL_INTERVAL_MS, "2000"),
        ];
        let config = ViewerConfig::resolve_with(Some(&path), env(&vars), &none).unwrap();
        assert_eq!(config.api_endpoint, "http://env:2000");
        assert_eq!(config.poll_interval_ms, 2000);

        // Flags beat environment, one field at a time.
        let flags = ConfigOverrides {
            api_endpoint: None,
            poll_interval_ms: Some(3000),
        };
        let config = ViewerConfig::resolve_with(Some(&path), env(&vars), &flags).unwrap();
        assert_eq!(config.api_endpoint, "http://env:2000");
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.request_timeout_ms, 900);
    }

    #[test]
    fn test_resolve_validates_final_result() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_ms = 0\n").unwrap();

        let none = ConfigOverrides::default();
        let result = ViewerConfig::resolve_with(Some(&path), env(&[]), &none);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let flags = ConfigOverrides {
            poll_interval_ms: Some(50),
            ..ConfigOverrides::default()
        };
        let config = ViewerConfig::resolve_with(Some(&path), env(&[]), &flags).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ViewerConfig {
            poll_interval_ms: 1200,
            ..ViewerConfig::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ViewerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
