//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the contact relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Form endpoint and confirmation page.
    pub endpoint: EndpointConfig,

    /// Notification addressing and delivery.
    pub mail: MailConfig,

    /// Per-field maxima and spam heuristics.
    pub limits: FieldLimits,

    /// Origin allow-list.
    pub origin: OriginConfig,

    /// Per-client quota.
    pub rate_limit: RateLimitConfig,

    /// Audit log settings.
    pub audit: AuditConfig,

    /// Durable state location.
    pub storage: StorageConfig,

    /// Development mode: dump messages to disk instead of delivering them
    /// and accept local origins.
    pub dev_mode: bool,

    /// Observability settings.
    pub observability: ObservabilityConfig,
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

/// Endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path the form posts to.
    pub path: String,

    /// Static page clients are redirected to after a successful submission.
    pub success_redirect: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            path: "/contact".to_string(),
            success_redirect: "/thanks.html".to_string(),
        }
    }
}

/// Mail configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailConfig {
    /// Address notifications are delivered to.
    pub recipient: String,

    /// Site identifier used in the subject and From display name.
    pub site: String,

    /// From address, also used as the envelope sender.
    pub from_address: String,

    /// sendmail-compatible binary.
    pub sendmail_path: PathBuf,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            recipient: "info@example.com".to_string(),
            site: "example.com".to_string(),
            from_address: "noreply@example.com".to_string(),
            sendmail_path: PathBuf::from("/usr/sbin/sendmail"),
        }
    }
}

/// Field length maxima, counted in characters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldLimits {
    pub name: usize,
    pub email: usize,
    pub phone: usize,
    pub message: usize,

    /// Maximum `http://`/`https://` occurrences in a message (0 = unlimited).
    pub max_links: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            name: 80,
            email: 120,
            phone: 40,
            message: 3000,
            max_links: 5,
        }
    }
}

/// Origin allow-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Hosts accepted in the Origin/Referer header (exact, lowercase).
    pub allowed_hosts: Vec<String>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: vec!["example.com".to_string(), "www.example.com".to_string()],
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted submissions per client within the window.
    pub max_requests: usize,

    /// Sliding window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 300,
        }
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable the audit log.
    pub enabled: bool,

    /// Include raw email, name and phone in audit events.
    pub log_pii: bool,

    /// One file per calendar day (`monitor-YYYYMMDD.log`).
    pub daily_rotate: bool,

    /// Days of rotated logs to keep (0 = keep forever).
    pub retention_days: u64,

    /// Probability that a request triggers a retention sweep.
    pub cleanup_probability: f64,

    /// Optional fixed-interval background sweep, in seconds.
    pub sweep_interval_secs: Option<u64>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_pii: false,
            daily_rotate: true,
            retention_days: 14,
            cleanup_probability: 0.02,
            sweep_interval_secs: None,
        }
    }
}

/// Durable state location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Preferred base directory. Falls back to the system temp directory.
    pub runtime_dir: Option<PathBuf>,

    /// Name of the private directory created under the base.
    pub app_dir_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            runtime_dir: None,
            app_dir_name: "contact_relay".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            dev_mode = true

            [mail]
            recipient = "office@vbf.test"

            [rate_limit]
            max_requests = 3
            "#,
        )
        .unwrap();

        assert!(config.dev_mode);
        assert_eq!(config.mail.recipient, "office@vbf.test");
        assert_eq!(config.mail.from_address, "noreply@example.com");
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 300);
        assert_eq!(config.limits.message, 3000);
        assert_eq!(config.audit.retention_days, 14);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_parses_lowercase() {
        let config: RelayConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
