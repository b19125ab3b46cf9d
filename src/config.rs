//! Configuration management for ratewarden.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, WardenError};

/// Main configuration for the warden.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Breach notification configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// What to decide when the store fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Named per-route rules
    #[serde(default)]
    pub routes: HashMap<String, RouteRule>,
}

/// Store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the backing file. When unset, counters live in memory only
    /// and limits are enforced per-process.
    pub path: Option<PathBuf>,
}

/// Breach notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Webhook URL breach events are POSTed to. When unset, alerting is
    /// disabled with no change to allow/deny behavior.
    pub endpoint: Option<String>,

    /// Delivery timeout in milliseconds
    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_notify_timeout_ms(),
        }
    }
}

fn default_notify_timeout_ms() -> u64 {
    5000
}

/// What the guard decides when the store is unreachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the request and log the failure. The default: a broken store
    /// should not take the application down with it.
    #[default]
    FailOpen,
    /// Reject requests while the store is unhealthy.
    FailClosed,
}

/// Request budget for one route: `limit` requests per `period_secs` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Maximum requests allowed in one window
    pub limit: u64,
    /// Window length in seconds
    pub period_secs: u64,
}

impl RouteRule {
    /// Create a rule, rejecting zero values up front so a bad rule is
    /// caught at setup time rather than mid-traffic.
    pub fn new(limit: u64, period_secs: u64) -> Result<Self> {
        let rule = Self { limit, period_secs };
        rule.validate()?;
        Ok(rule)
    }

    /// Check the rule for zero limit or period.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(WardenError::Config(
                "limit must be greater than zero".to_string(),
            ));
        }
        if self.period_secs == 0 {
            return Err(WardenError::Config(
                "period_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl WardenConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WardenConfig = serde_yaml::from_str(yaml)
            .map_err(|e| WardenError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every route rule before any request is evaluated.
    pub fn validate(&self) -> Result<()> {
        for (name, rule) in &self.routes {
            if rule.limit == 0 {
                return Err(WardenError::Config(format!(
                    "route '{}': limit must be greater than zero",
                    name
                )));
            }
            if rule.period_secs == 0 {
                return Err(WardenError::Config(format!(
                    "route '{}': period_secs must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Get the rule configured for a route, if any.
    pub fn route(&self, name: &str) -> Option<&RouteRule> {
        self.routes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WardenConfig::default();
        assert!(config.store.path.is_none());
        assert!(config.notifier.endpoint.is_none());
        assert_eq!(config.failure_policy, FailurePolicy::FailOpen);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
store:
  path: /var/lib/ratewarden/counters.json
notifier:
  endpoint: https://hooks.example.com/breach
  timeout_ms: 2000
failure_policy: fail_closed
routes:
  home:
    limit: 5
    period_secs: 60
"#;
        let config = WardenConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.store.path.as_deref(),
            Some(Path::new("/var/lib/ratewarden/counters.json"))
        );
        assert_eq!(
            config.notifier.endpoint.as_deref(),
            Some("https://hooks.example.com/breach")
        );
        assert_eq!(config.notifier.timeout_ms, 2000);
        assert_eq!(config.failure_policy, FailurePolicy::FailClosed);

        let rule = config.route("home").unwrap();
        assert_eq!(rule.limit, 5);
        assert_eq!(rule.period_secs, 60);
    }

    #[test]
    fn test_from_yaml_defaults() {
        let config = WardenConfig::from_yaml("routes: {}").unwrap();
        assert_eq!(config.notifier.timeout_ms, 5000);
        assert_eq!(config.failure_policy, FailurePolicy::FailOpen);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let yaml = r#"
routes:
  home:
    limit: 0
    period_secs: 60
"#;
        let err = WardenConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn test_zero_period_rejected() {
        let yaml = r#"
routes:
  home:
    limit: 5
    period_secs: 0
"#;
        let err = WardenConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("period"));
    }

    #[test]
    fn test_route_rule_validation() {
        assert!(RouteRule::new(5, 60).is_ok());
        assert!(RouteRule::new(0, 60).is_err());
        assert!(RouteRule::new(5, 0).is_err());
    }
}
