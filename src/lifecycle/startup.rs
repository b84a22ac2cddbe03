//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Resolve the runtime directory before any traffic is accepted
//! - Pick the delivery transport
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{load_config, ConfigError, RelayConfig};
use crate::mail::transport::{self, MailTransport};
use crate::storage::{RuntimeDirs, StorageError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

/// Everything the server needs, built once.
pub struct Prepared {
    pub config: Arc<RelayConfig>,
    pub dirs: RuntimeDirs,
    pub transport: Arc<dyn MailTransport>,
}

/// Load the config file, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<RelayConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => {
            tracing::warn!("No config file given, using built-in defaults");
            Ok(RelayConfig::default())
        }
    }
}

/// Resolve storage and the transport for a validated config.
pub fn prepare(config: RelayConfig) -> Result<Prepared, StartupError> {
    let dirs = RuntimeDirs::resolve(&config.storage)?;
    let transport = transport::from_config(&config, &dirs);

    tracing::info!(
        endpoint = %config.endpoint.path,
        dev_mode = config.dev_mode,
        allowed_hosts = ?config.origin.allowed_hosts,
        quota = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        audit = config.audit.enabled,
        "Configuration loaded"
    );
    if config.dev_mode {
        tracing::warn!("Development mode: messages are written to disk, not delivered");
    }
    if config.audit.log_pii {
        tracing::warn!("Audit log includes personal data");
    }

    Ok(Prepared {
        config: Arc::new(config),
        dirs,
        transport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_with_temp_storage() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = RelayConfig::default();
        config.storage.runtime_dir = Some(tmp.path().to_path_buf());

        let prepared = prepare(config).unwrap();
        assert!(prepared.dirs.monitor_dir().starts_with(tmp.path()));
    }

    #[test]
    fn test_missing_config_file_fails() {
        let err = load(Some(Path::new("/nonexistent/relay.toml"))).err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Io(_))));
    }
}
