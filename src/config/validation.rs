//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, durations > 0 and at most one year)
//! - Check addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{GuardConfig, LimiterConfig};

/// Upper bound for `block_duration_minutes` (one year).
pub const MAX_BLOCK_DURATION_MINUTES: u64 = 365 * 24 * 60;

/// Upper bound for the cleanup interval and idle timeout (one year).
pub const MAX_CLEANUP_SECS: u64 = 365 * 24 * 60 * 60;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{section}.max_attempts must be at least 1")]
    ZeroAttempts { section: &'static str },

    #[error("{section}.block_duration_minutes must be at least 1")]
    ZeroBlockDuration { section: &'static str },

    #[error("{section}.block_duration_minutes must be at most {max}")]
    BlockDurationTooLong { section: &'static str, max: u64 },

    #[error("cleanup.{field} must be greater than zero")]
    ZeroCleanup { field: &'static str },

    #[error("cleanup.{field} must be at most {max}")]
    CleanupTooLong { field: &'static str, max: u64 },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Check the configuration, collecting every error found.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_limiter("auth_limiter", &config.auth_limiter, &mut errors);
    check_limiter("api_limiter", &config.api_limiter, &mut errors);

    check_cleanup("interval_secs", config.cleanup.interval_secs, &mut errors);
    check_cleanup("idle_timeout_secs", config.cleanup.idle_timeout_secs, &mut errors);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_limiter(section: &'static str, limiter: &LimiterConfig, errors: &mut Vec<ValidationError>) {
    if limiter.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts { section });
    }
    if limiter.block_duration_minutes == 0 {
        errors.push(ValidationError::ZeroBlockDuration { section });
    } else if limiter.block_duration_minutes > MAX_BLOCK_DURATION_MINUTES {
        errors.push(ValidationError::BlockDurationTooLong {
            section,
            max: MAX_BLOCK_DURATION_MINUTES,
        });
    }
}

fn check_cleanup(field: &'static str, secs: u64, errors: &mut Vec<ValidationError>) {
    if secs == 0 {
        errors.push(ValidationError::ZeroCleanup { field });
    } else if secs > MAX_CLEANUP_SECS {
        errors.push(ValidationError::CleanupTooLong {
            field,
            max: MAX_CLEANUP_SECS,
        });
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
