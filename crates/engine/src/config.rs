//! Authorization service configuration
//!
//! All tunables are overridable via a JSON config file; every field has a
//! production default so a partial file (or none) works.

use cardgate_core::RetryPolicy;
use cardgate_limits::LimitConfig;
use cardgate_risk::RiskConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the authorization engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// TTL applied at hold creation, in hours.
    #[serde(default = "default_hold_expiry_hours")]
    pub hold_expiry_hours: i64,

    /// Risk thresholds and high-risk sets.
    #[serde(default)]
    pub risk: RiskConfig,

    /// Fallback limits and channel multipliers.
    #[serde(default)]
    pub limits: LimitConfig,

    /// Expiry sweep cadence.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// External collaborator endpoints and budgets.
    #[serde(default)]
    pub externals: ExternalsConfig,

    /// End-to-end authorization budget, in seconds.
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: u64,
}

/// Expiry sweeper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_interval_seconds")]
    pub interval_seconds: u64,
}

/// Endpoints and budgets for the external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalsConfig {
    #[serde(default)]
    pub card_service: ExternalServiceConfig,

    #[serde(default)]
    pub ledger: ExternalServiceConfig,

    #[serde(default)]
    pub notification: ExternalServiceConfig,
}

/// One external service: where it lives and how patient we are with it.
///
/// A missing `base_url` means the in-process stand-in is used (mock
/// directory, in-memory ledger); the webhook notifier has no in-process
/// stand-in and is simply off without a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalServiceConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry budget for transient upstream failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_hold_expiry_hours() -> i64 {
    168 // 7 days
}

fn default_deadline_seconds() -> u64 {
    10
}

fn default_sweep_interval_seconds() -> u64 {
    3600
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            hold_expiry_hours: default_hold_expiry_hours(),
            risk: RiskConfig::default(),
            limits: LimitConfig::default(),
            sweep: SweepConfig::default(),
            externals: ExternalsConfig::default(),
            deadline_seconds: default_deadline_seconds(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl Default for ExternalServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_timeout_seconds(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl AuthorizationConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// End-to-end authorization budget.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }

    /// Expiry sweep cadence.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep.interval_seconds)
    }
}

impl ExternalServiceConfig {
    /// Per-call timeout for this service.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Retry policy for this service.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.backoff_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthorizationConfig::default();

        assert_eq!(config.hold_expiry_hours, 168);
        assert_eq!(config.deadline_seconds, 10);
        assert_eq!(config.sweep.interval_seconds, 3600);
        assert_eq!(config.externals.card_service.timeout_seconds, 5);
        assert_eq!(config.externals.ledger.retry.max_attempts, 3);
        assert_eq!(config.externals.ledger.retry.backoff_ms, 500);
        assert!(config.externals.card_service.base_url.is_none());
    }

    #[test]
    fn test_duration_helpers() {
        let config = AuthorizationConfig::default();
        assert_eq!(config.deadline(), Duration::from_secs(10));
        assert_eq!(config.sweep_interval(), Duration::from_secs(3600));
        assert_eq!(
            config.externals.ledger.timeout(),
            Duration::from_secs(5)
        );

        let policy = config.externals.ledger.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "hold_expiry_hours": 24,
            "externals": { "ledger": { "base_url": "http://ledger.internal" } }
        }"#;
        let config: AuthorizationConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.hold_expiry_hours, 24);
        assert_eq!(
            config.externals.ledger.base_url.as_deref(),
            Some("http://ledger.internal")
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.externals.ledger.timeout_seconds, 5);
        assert_eq!(config.risk.challenge_threshold, 70);
        assert_eq!(config.sweep.interval_seconds, 3600);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = AuthorizationConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AuthorizationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.hold_expiry_hours, config.hold_expiry_hours);
        assert_eq!(parsed.deadline_seconds, config.deadline_seconds);
    }
}
