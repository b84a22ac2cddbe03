//! Private runtime directory resolution.
//!
//! # Responsibilities
//! - Pick a writable base (configured path first, system temp second)
//! - Create the application directory tree with owner-only permissions
//! - Re-create the tree when it disappears while the server runs
//!
//! # Layout
//! ```text
//! <base>/<app_dir_name>/
//!     rl/        one JSON record per hashed rate-limit key
//!     monitor/   audit logs, one JSON object per line
//!     dev/       raw message dumps (development mode only)
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::StorageConfig;

const RATE_LIMIT_DIR: &str = "rl";
const MONITOR_DIR: &str = "monitor";
const DEV_DIR: &str = "dev";

/// Failure to obtain writable durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no writable runtime directory (tried {tried:?})")]
    NoWritableBase { tried: Vec<PathBuf> },
    #[error("cannot create {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
}

/// Resolved durable state directories.
#[derive(Debug, Clone)]
pub struct RuntimeDirs {
    base: PathBuf,
    app: PathBuf,
}

impl RuntimeDirs {
    /// Resolve the base directory and create the application tree.
    pub fn resolve(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut tried = Vec::new();

        if let Some(preferred) = &config.runtime_dir {
            tried.push(preferred.clone());
            if ensure_dir(preferred).is_ok() && is_writable(preferred) {
                return Self::at(preferred.clone(), &config.app_dir_name);
            }
            tracing::warn!(path = %preferred.display(), "Configured runtime dir not writable, falling back");
        }

        let fallback = std::env::temp_dir();
        tried.push(fallback.clone());
        if fallback.is_dir() && is_writable(&fallback) {
            return Self::at(fallback, &config.app_dir_name);
        }

        Err(StorageError::NoWritableBase { tried })
    }

    fn at(base: PathBuf, app_dir_name: &str) -> Result<Self, StorageError> {
        let dirs = Self {
            app: base.join(app_dir_name),
            base,
        };
        dirs.ensure()?;
        tracing::info!(path = %dirs.app.display(), "Runtime directory ready");
        Ok(dirs)
    }

    /// Make sure the application, rate-limit and monitor directories exist.
    pub fn ensure(&self) -> Result<(), StorageError> {
        for dir in [&self.app, &self.rate_limit_dir(), &self.monitor_dir()] {
            ensure_dir(dir).map_err(|source| StorageError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Create the development dump directory on demand.
    pub fn ensure_dev(&self) -> Result<PathBuf, StorageError> {
        let dir = self.dev_dir();
        ensure_dir(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn app_dir(&self) -> &Path {
        &self.app
    }

    pub fn rate_limit_dir(&self) -> PathBuf {
        self.app.join(RATE_LIMIT_DIR)
    }

    pub fn monitor_dir(&self) -> PathBuf {
        self.app.join(MONITOR_DIR)
    }

    pub fn dev_dir(&self) -> PathBuf {
        self.app.join(DEV_DIR)
    }
}

/// Create `dir` (and parents) if missing, owner-only on Unix.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        builder.mode(0o700);
        builder.create(dir)?;
        // umask may have widened the mode
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
    }
    #[cfg(not(unix))]
    builder.create(dir)?;

    Ok(())
}

fn is_writable(dir: &Path) -> bool {
    let probe = dir.join(format!(".probe-{:016x}", rand::random::<u64>()));
    match fs::OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
