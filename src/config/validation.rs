//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses the notification depends on
//! - Validate value ranges (limits > 0, probability within [0, 1])
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use email_address::EmailAddress;
use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Upper bound for `audit.retention_days`, roughly a century.
const MAX_RETENTION_DAYS: u64 = 36_500;

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }

    if !config.endpoint.path.starts_with('/') {
        errors.push(ValidationError::new("endpoint.path", "must start with '/'"));
    }
    if !config.endpoint.success_redirect.starts_with('/') {
        errors.push(ValidationError::new(
            "endpoint.success_redirect",
            "must start with '/'",
        ));
    }

    if !EmailAddress::is_valid(&config.mail.recipient) {
        errors.push(ValidationError::new("mail.recipient", "not a valid address"));
    }
    if !EmailAddress::is_valid(&config.mail.from_address) {
        errors.push(ValidationError::new("mail.from_address", "not a valid address"));
    }
    if config.mail.site.trim().is_empty() {
        errors.push(ValidationError::new("mail.site", "must not be empty"));
    }

    let limits = [
        ("limits.name", config.limits.name),
        ("limits.email", config.limits.email),
        ("limits.phone", config.limits.phone),
        ("limits.message", config.limits.message),
    ];
    for (field, value) in limits {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be > 0"));
        }
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
    }

    let p = config.audit.cleanup_probability;
    if !(0.0..=1.0).contains(&p) {
        errors.push(ValidationError::new(
            "audit.cleanup_probability",
            format!("{p} is outside [0, 1]"),
        ));
    }
    if config.audit.retention_days > MAX_RETENTION_DAYS {
        errors.push(ValidationError::new(
            "audit.retention_days",
            format!("must be at most {MAX_RETENTION_DAYS} (0 keeps logs forever)"),
        ));
    }
    if config.audit.sweep_interval_secs == Some(0) {
        errors.push(ValidationError::new("audit.sweep_interval_secs", "must be > 0"));
    }

    if config.storage.app_dir_name.is_empty()
        || config.storage.app_dir_name.contains(['/', '\\'])
        || config.storage.app_dir_name == ".."
    {
        errors.push(ValidationError::new(
            "storage.app_dir_name",
            "must be a single path component",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
