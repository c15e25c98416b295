//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard
//! service. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the storefront guard service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Limiter guarding the admin login route.
    pub auth_limiter: LimiterConfig,

    /// Limiter guarding the public write route.
    pub api_limiter: LimiterConfig,

    /// Idle-entry cleanup shared by both limiters.
    pub cleanup: CleanupConfig,

    /// Public API behavior.
    pub api: ApiConfig,

    /// Admin credentials.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            auth_limiter: LimiterConfig::auth(),
            api_limiter: LimiterConfig::api(),
            cleanup: CleanupConfig::default(),
            api: ApiConfig::default(),
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Attempt limiter configuration.
///
/// Fixed at startup; limiters are not rebuilt while the process runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Failed attempts allowed before the key is blocked.
    pub max_attempts: u32,

    /// How long a tripped key stays blocked, in minutes.
    pub block_duration_minutes: u64,
}

impl LimiterConfig {
    /// Login protection: 3 attempts, 2 minute block.
    pub fn auth() -> Self {
        Self {
            max_attempts: 3,
            block_duration_minutes: 2,
        }
    }

    /// Public API protection: 5 attempts, 1 minute block.
    pub fn api() -> Self {
        Self {
            max_attempts: 5,
            block_duration_minutes: 1,
        }
    }

    /// Saturates at `Duration::MAX` for values too large to express in seconds.
    pub fn block_duration(&self) -> Duration {
        self.block_duration_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::auth()
    }
}

/// Idle-entry cleanup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Seconds between cleanup sweeps.
    pub interval_secs: u64,

    /// Seconds since the last attempt after which an unblocked entry is dropped.
    pub idle_timeout_secs: u64,
}

impl CleanupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5 * 60,
            idle_timeout_secs: 10 * 60,
        }
    }
}

/// Public API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Count every accepted order submission against the API limiter.
    ///
    /// Enabled by default to match the deployed storefront, where each
    /// successful submission is recorded as an attempt.
    pub count_successful_submissions: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            count_successful_submissions: true,
        }
    }
}

/// Admin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Password accepted by the login route. Empty disables login.
    pub password: String,

    /// API key for the admin status routes (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password: String::new(),
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "storefront_guard=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
