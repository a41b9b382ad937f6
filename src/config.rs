//! Pipeline configuration
//!
//! Deserializable from whatever format the host bootstrap reads; every key
//! is optional.

use crate::core::{Result, Severity, StasherError, TimestampFormat};
use crate::notifications::extract::DEFAULT_FILTER_PARAMETERS;
use crate::notifications::subscriber::DEFAULT_HOST_ORIGINS;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Namespaces attached to when none are configured
pub const DEFAULT_ATTACH_TO: [&str; 2] = ["action_controller", "active_record"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit `@source`; derived from hostname and app name when absent
    pub source: Option<String>,
    pub hostname: Option<String>,
    pub app_name: Option<String>,
    /// Minimum level for direct log calls (WARN when unset)
    pub log_level: Option<Severity>,
    pub attach_to: Vec<String>,
    /// Detach the host's default log subscribers
    pub suppress_app_log: bool,
    /// Install the severity logger as the process-wide `log` logger
    pub redirect_logger: bool,
    pub filter_parameters: Vec<String>,
    pub host_origins: Vec<String>,
    pub timestamp_format: TimestampFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            hostname: None,
            app_name: None,
            log_level: None,
            attach_to: DEFAULT_ATTACH_TO.iter().map(|s| s.to_string()).collect(),
            suppress_app_log: true,
            redirect_logger: false,
            filter_parameters: DEFAULT_FILTER_PARAMETERS.iter().map(|s| s.to_string()).collect(),
            host_origins: DEFAULT_HOST_ORIGINS.iter().map(|s| s.to_string()).collect(),
            timestamp_format: TimestampFormat::default(),
        }
    }
}

impl Config {
    pub fn level(&self) -> Severity {
        self.log_level.unwrap_or(Severity::Warn)
    }

    /// The `@source` value: explicit, or `rails://<hostname>/<app path>`
    pub fn resolved_source(&self) -> Result<String> {
        if let Some(source) = &self.source {
            return Ok(source.clone());
        }

        let app_name = self.app_name.as_deref().ok_or_else(|| {
            StasherError::config("source", "set either `source` or `app_name`")
        })?;
        let hostname = self.hostname.clone().unwrap_or_else(default_hostname);

        Ok(format!("rails://{}/{}", hostname, underscore(app_name)))
    }
}

/// `HOSTNAME` from the environment, falling back to `localhost`
pub fn default_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

static ACRONYM_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z\d]+)([A-Z][a-z])").expect("acronym pattern is valid"));
static WORD_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("word pattern is valid"));

/// `RSpec::Mocks` → `r_spec/mocks`
pub fn underscore(name: &str) -> String {
    let path = name.replace("::", "/");
    let path = ACRONYM_BOUNDARY.replace_all(&path, "${1}_${2}");
    let path = WORD_BOUNDARY.replace_all(&path, "${1}_${2}");
    path.replace('-', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.level(), Severity::Warn);
        assert!(config.suppress_app_log);
        assert!(!config.redirect_logger);
        assert_eq!(config.attach_to, ["action_controller", "active_record"]);
        assert_eq!(config.filter_parameters, ["password", "password_confirmation"]);
    }

    #[test]
    fn test_source_from_hostname_and_app() {
        let config = Config {
            hostname: Some("hostname".to_string()),
            app_name: Some("RSpec::Mocks".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_source().unwrap(), "rails://hostname/r_spec/mocks");
    }

    #[test]
    fn test_explicit_source_wins() {
        let config = Config {
            source: Some("source".to_string()),
            app_name: Some("Shop".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_source().unwrap(), "source");
    }

    #[test]
    fn test_missing_source_is_config_error() {
        let result = Config::default().resolved_source();
        assert!(matches!(result, Err(StasherError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_underscore() {
        assert_eq!(underscore("RSpec::Mocks"), "r_spec/mocks");
        assert_eq!(underscore("MyShop"), "my_shop");
        assert_eq!(underscore("HTTPClient::V2"), "http_client/v2");
        assert_eq!(underscore("my-app"), "my_app");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"log_level":"debug","attach_to":["active_record"]}"#).unwrap();

        assert_eq!(config.level(), Severity::Debug);
        assert_eq!(config.attach_to, ["active_record"]);
        assert!(config.suppress_app_log);
    }
}
