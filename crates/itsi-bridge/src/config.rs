//! Configuration for the alert action and the request handlers.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::error::SettingsError;
use crate::handlers::response::ResponseConfig;
use crate::platform::DEFAULT_ITSI_ROLES;
use crate::telemetry::LogFormat;
use crate::Record;

/// Stored-credential name holding the Puppet Enterprise secret.
pub const PASSWORD_NAME: &str = "puppetenterprise_itsi_password";

/// Default `serve` port; 8089 is splunkd's own management port.
pub const DEFAULT_PORT: u16 = 8095;

/// Default splunkd management URI the server mode talks to.
pub const DEFAULT_SPLUNKD_URI: &str = "https://127.0.0.1:8089";

/// ITSI versions whose SDK cannot update owner/status.
pub const DEFAULT_UNSUPPORTED_VERSIONS: &[&str] = &["2.6.0"];

/// Settings splunkd passes to the alert action on stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertSettings {
    pub session_key: String,
    pub server_uri: String,
    /// The correlation (group) event that triggered the action
    #[serde(default)]
    pub result: Record,
    pub configuration: ActionConfig,
}

impl AlertSettings {
    /// Parse the settings JSON.
    pub fn from_json(input: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(input)?;
        if settings.configuration.endpoint_url.trim().is_empty() {
            return Err(SettingsError::Missing("configuration.endpoint_url"));
        }
        Ok(settings)
    }
}

/// How the stored credential is presented to Puppet Enterprise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// Stored secret sent as an RBAC token
    #[default]
    Token,
    /// `username` plus stored secret sent as HTTP Basic auth
    Basic,
}

/// Alert action parameters configured in Splunk.
///
/// splunkd sends every value as a string, so the flags also accept
/// `"1"`/`"0"`/`"true"`/`"false"`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    #[serde(default)]
    pub username: Option<String>,
    pub endpoint_url: String,
    /// `;`-separated recipient target names
    #[serde(default)]
    pub recipients: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub auth_scheme: AuthScheme,
    /// Comment on the correlation event after a successful send
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub update_correlation: bool,
    /// Comment on every child event after a successful send
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub update_children: bool,
}

impl ActionConfig {
    /// Recipient names, trimmed, empty entries dropped.
    #[must_use]
    pub fn recipient_names(&self) -> Vec<&str> {
        self.recipients
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Configured username, if non-empty.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Configured priority, if non-empty.
    #[must_use]
    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref().filter(|p| !p.trim().is_empty())
    }
}

const fn default_true() -> bool {
    true
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().is_some_and(|n| n != 0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "" | "0" | "false" | "no" | "off" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag value: {other}"))),
        },
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid flag value: {other}"))),
    }
}

/// Process-level configuration read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (`serve` mode).
    pub port: u16,
    /// HTTP server bind address (`serve` mode), loopback unless overridden.
    pub bind: IpAddr,
    /// The only splunkd `server.rest_uri` accepted in `serve` mode.
    pub splunkd_uri: String,
    /// ITSI versions where only the comment is written.
    pub unsupported_versions: Vec<String>,
    /// Roles that qualify a user as event owner.
    pub itsi_roles: Vec<String>,
    /// Directory for log files; stderr when unset.
    pub log_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("PE_ITSI_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            bind: env::var("PE_ITSI_BIND")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            splunkd_uri: env::var("PE_ITSI_SPLUNKD_URI")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SPLUNKD_URI.to_string()),
            unsupported_versions: list_from_env(
                "PE_ITSI_UNSUPPORTED_VERSIONS",
                DEFAULT_UNSUPPORTED_VERSIONS,
            ),
            itsi_roles: list_from_env("PE_ITSI_ROLES", DEFAULT_ITSI_ROLES),
            log_dir: env::var("PE_ITSI_LOG_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            log_format: env::var("PE_ITSI_LOG_FORMAT")
                .map(|v| LogFormat::from_name(&v))
                .unwrap_or_default(),
        }
    }
}

impl Config {
    /// Settings for [`crate::ResponseHandler`].
    #[must_use]
    pub fn response_config(&self) -> ResponseConfig {
        ResponseConfig {
            unsupported_versions: self.unsupported_versions.clone(),
            itsi_roles: self.itsi_roles.clone(),
        }
    }
}

fn list_from_env(var: &str, default: &[&str]) -> Vec<String> {
    env::var(var)
        .ok()
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| default.iter().map(ToString::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SETTINGS: &str = r#"{
        "session_key": "abc",
        "server_uri": "https://127.0.0.1:8089",
        "result": { "event_id": "corr-1", "severity": "5" },
        "configuration": {
            "username": "admin",
            "endpoint_url": "https://pe.example.com:8143/orchestrator/v1/command/deploy",
            "recipients": "ops; dba ;;",
            "priority": "high",
            "update_children": "1"
        }
    }"#;

    #[test]
    fn test_parse_settings() {
        let settings = AlertSettings::from_json(SETTINGS).unwrap();
        assert_eq!(settings.session_key, "abc");
        assert_eq!(settings.result["event_id"], "corr-1");

        let config = &settings.configuration;
        assert_eq!(config.username(), Some("admin"));
        assert_eq!(config.recipient_names(), ["ops", "dba"]);
        assert_eq!(config.priority(), Some("high"));
        assert_eq!(config.auth_scheme, AuthScheme::Token);
        assert!(config.update_correlation);
        assert!(config.update_children);
    }

    #[test]
    fn test_flag_defaults_and_values() {
        let config: ActionConfig = serde_json::from_value(serde_json::json!({
            "endpoint_url": "https://pe",
            "auth_scheme": "basic",
            "update_correlation": "0",
            "priority": "",
            "username": " "
        }))
        .unwrap();
        assert!(!config.update_correlation);
        assert!(!config.update_children);
        assert_eq!(config.auth_scheme, AuthScheme::Basic);
        assert_eq!(config.priority(), None);
        assert_eq!(config.username(), None);
        assert!(config.recipient_names().is_empty());
    }

    #[test]
    fn test_invalid_flag() {
        let result: Result<ActionConfig, _> = serde_json::from_value(serde_json::json!({
            "endpoint_url": "https://pe",
            "update_children": "maybe"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_endpoint_url() {
        let input = r#"{"session_key":"k","server_uri":"u","configuration":{"endpoint_url":" "}}"#;
        assert!(matches!(
            AlertSettings::from_json(input),
            Err(SettingsError::Missing("configuration.endpoint_url"))
        ));
        assert!(matches!(
            AlertSettings::from_json("{}"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var("PE_ITSI_PORT", "9000");
        env::set_var("PE_ITSI_BIND", "0.0.0.0");
        env::set_var("PE_ITSI_SPLUNKD_URI", "https://splunk.internal:8089");
        env::set_var("PE_ITSI_UNSUPPORTED_VERSIONS", "2.6.0, 2.6.1");
        env::remove_var("PE_ITSI_ROLES");

        let config = Config::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.splunkd_uri, "https://splunk.internal:8089");
        assert_eq!(config.unsupported_versions, ["2.6.0", "2.6.1"]);
        assert_eq!(config.itsi_roles, ["itoa_user", "itoa_analyst", "itoa_admin"]);

        env::remove_var("PE_ITSI_PORT");
        env::remove_var("PE_ITSI_UNSUPPORTED_VERSIONS");
        env::remove_var("PE_ITSI_BIND");
        env::remove_var("PE_ITSI_SPLUNKD_URI");

        let config = Config::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_ne!(config.port, 8089);
        assert!(config.bind.is_loopback());
        assert_eq!(config.splunkd_uri, DEFAULT_SPLUNKD_URI);
        assert_eq!(config.response_config().unsupported_versions, ["2.6.0"]);
    }
}
