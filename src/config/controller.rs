//! # Controller Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::constants;
use std::time::Duration;

/// Operator-wide configuration
///
/// All settings have defaults and can be overridden via environment variables.
/// Environment variables are typically populated from a `ConfigMap` using
/// `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Name of the variable holding the bootstrap backend envelope
    pub operator_config_env: String,
    /// Instance name given to the environment-configured backend
    pub env_backend_name: String,
    /// Deadline for each adapter `init`/`get` call (seconds)
    pub backend_timeout_secs: u64,
    /// Requeue interval after a successful reconciliation (seconds)
    pub resync_interval_secs: u64,
    /// Fibonacci backoff floor for failed reconciliations (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff ceiling for failed reconciliations (seconds)
    pub backoff_max_secs: u64,
    /// Maximum concurrent reconciliations per controller
    pub max_concurrent_reconciliations: u16,
    /// HTTP port for metrics and health checks
    pub metrics_port: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            operator_config_env: constants::OPERATOR_CONFIG_ENV.to_string(),
            env_backend_name: constants::DEFAULT_ENV_BACKEND_NAME.to_string(),
            backend_timeout_secs: constants::DEFAULT_BACKEND_TIMEOUT_SECS,
            resync_interval_secs: constants::DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_secs: constants::DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: constants::DEFAULT_BACKOFF_MAX_SECS,
            max_concurrent_reconciliations: 10,
            metrics_port: constants::DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            log_enable_color: false,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            operator_config_env: defaults.operator_config_env,
            env_backend_name: env_var_or_default_str(
                "OPERATOR_BACKEND_NAME",
                &defaults.env_backend_name,
            ),
            backend_timeout_secs: env_var_or_default(
                "BACKEND_TIMEOUT_SECS",
                defaults.backend_timeout_secs,
            ),
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                defaults.resync_interval_secs,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", defaults.backoff_min_secs),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", defaults.backoff_max_secs),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", defaults.metrics_port),
            log_level: env_var_or_default_str("LOG_LEVEL", &defaults.log_level),
            log_format: env_var_or_default_str("LOG_FORMAT", &defaults.log_format),
            log_enable_color: env_var_or_default_bool("LOG_ENABLE_COLOR", false),
        }
    }

    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.operator_config_env, "OPERATOR_CONFIG");
        assert_eq!(config.backend_timeout(), Duration::from_secs(30));
        assert_eq!(config.resync_interval(), Duration::from_secs(300));
        assert!(config.backoff_min_secs < config.backoff_max_secs);
    }

    #[test]
    fn test_env_helpers_fall_back_on_malformed_values() {
        std::env::set_var("EXTERNALSECRET_TEST_TIMEOUT", "not-a-number");
        assert_eq!(env_var_or_default("EXTERNALSECRET_TEST_TIMEOUT", 30_u64), 30);

        std::env::set_var("EXTERNALSECRET_TEST_TIMEOUT_OK", "12");
        assert_eq!(env_var_or_default("EXTERNALSECRET_TEST_TIMEOUT_OK", 30_u64), 12);

        std::env::set_var("EXTERNALSECRET_TEST_COLOR", "Yes");
        assert!(env_var_or_default_bool("EXTERNALSECRET_TEST_COLOR", false));
        assert!(!env_var_or_default_bool("EXTERNALSECRET_TEST_COLOR_UNSET", false));
    }
}
