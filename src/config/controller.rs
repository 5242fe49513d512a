//! # Controller Configuration

use super::{env_var_or_default, env_var_or_default_str, parse_list};
use crate::constants::{
    DEFAULT_BACKOFF_MAX_MINUTES, DEFAULT_BACKOFF_MIN_MINUTES, DEFAULT_PROVIDER_ENDPOINT_TEMPLATE,
    DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_RECONCILE_DEADLINE_SECS, DEFAULT_SYNC_INTERVAL_SECS,
};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Name of the controller pod, forwarded to providers
    pub pod_name: String,
    /// UID of the controller pod, forwarded to providers
    pub pod_uid: String,
    /// Audiences for which service account tokens are requested
    /// Empty means no tokens are forwarded
    pub token_audiences: Vec<String>,
    /// Provider endpoint with a `{provider}` placeholder
    pub provider_endpoint_template: String,
    /// Timeout of a single provider HTTP call (seconds)
    pub provider_timeout_secs: u64,
    /// Upper bound on one reconciliation pass (seconds)
    pub reconcile_deadline_secs: u64,
    /// Requeue interval after a pass that did not need backoff (seconds)
    pub sync_interval_secs: u64,
    /// Fibonacci backoff floor (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff ceiling (minutes)
    pub backoff_max_minutes: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pod_name: String::new(),
            pod_uid: String::new(),
            token_audiences: Vec::new(),
            provider_endpoint_template: DEFAULT_PROVIDER_ENDPOINT_TEMPLATE.to_string(),
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            reconcile_deadline_secs: DEFAULT_RECONCILE_DEADLINE_SECS,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            pod_name: env_var_or_default_str("POD_NAME", ""),
            pod_uid: env_var_or_default_str("POD_UID", ""),
            token_audiences: parse_list(&env_var_or_default_str("TOKEN_REQUEST_AUDIENCES", "")),
            provider_endpoint_template: env_var_or_default_str(
                "PROVIDER_ENDPOINT_TEMPLATE",
                DEFAULT_PROVIDER_ENDPOINT_TEMPLATE,
            ),
            provider_timeout_secs: env_var_or_default(
                "PROVIDER_TIMEOUT_SECS",
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            ),
            reconcile_deadline_secs: env_var_or_default(
                "RECONCILE_DEADLINE_SECS",
                DEFAULT_RECONCILE_DEADLINE_SECS,
            ),
            sync_interval_secs: env_var_or_default(
                "SYNC_INTERVAL_SECS",
                DEFAULT_SYNC_INTERVAL_SECS,
            ),
            backoff_min_minutes: env_var_or_default(
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
        }
    }

    /// Get provider call timeout duration
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Get reconciliation deadline duration
    #[must_use]
    pub fn reconcile_deadline(&self) -> Duration {
        Duration::from_secs(self.reconcile_deadline_secs)
    }

    /// Get requeue duration after a successful pass
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.sync_interval(), Duration::from_secs(120));
        assert_eq!(config.reconcile_deadline(), Duration::from_secs(60));
        assert_eq!(config.provider_timeout(), Duration::from_secs(30));
        assert_eq!(config.backoff_min_minutes, 1);
        assert_eq!(config.backoff_max_minutes, 10);
        assert!(config.token_audiences.is_empty());
        assert!(config.provider_endpoint_template.contains("{provider}"));
    }
}
