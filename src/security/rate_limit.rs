//! Durable sliding-window rate limiting.
//!
//! Each client key maps to one JSON record `{"ts":[...]}` under the
//! rate-limit directory. The record file is locked exclusively for the whole
//! read-modify-write cycle, so concurrent requests sharing a key (in this
//! process or another) are serialized, while different keys never contend.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::observability::metrics;
use crate::storage::ensure_dir;

/// Rate limiter failures.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Quota exhausted for the current window.
    #[error("rate limited")]
    Limited,
    /// Record could not be opened, locked or written.
    #[error("rate limit storage error: {0}")]
    Storage(#[from] io::Error),
}

/// Persisted window for one key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WindowRecord {
    ts: Vec<i64>,
}

impl WindowRecord {
    /// Decode a record, treating empty or corrupt content as an empty window.
    fn decode(raw: &[u8]) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Corrupt rate limit record, starting empty");
            Self::default()
        })
    }

    fn prune(&mut self, min: i64) {
        self.ts.retain(|&t| t >= min);
    }
}

/// File-backed sliding-window limiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    dir: PathBuf,
}

impl RateLimiter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Admit one event for `key` or fail with [`RateLimitError::Limited`].
    pub fn check(&self, key: &str, max: usize, window_secs: u64) -> Result<(), RateLimitError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        self.check_at(key, max, window_secs, now)
    }

    /// Same as [`check`](Self::check) with an explicit clock.
    pub fn check_at(
        &self,
        key: &str,
        max: usize,
        window_secs: u64,
        now: i64,
    ) -> Result<(), RateLimitError> {
        ensure_dir(&self.dir)?;
        let path = self.record_path(key);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;

        let result = update_window(&mut file, max, window_secs, now);

        // Closing the handle also releases the lock; unlock explicitly so
        // the release does not depend on drop order.
        let _ = file.unlock();

        if matches!(result, Err(RateLimitError::Limited)) {
            metrics::record_rate_limited();
        }
        result
    }

    /// Storage location for a key. The key itself is never written to disk.
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_key(key)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn update_window(
    file: &mut File,
    max: usize,
    window_secs: u64,
    now: i64,
) -> Result<(), RateLimitError> {
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;

    let mut record = WindowRecord::decode(&raw);
    record.prune(now - window_secs as i64);

    if record.ts.len() >= max {
        return Err(RateLimitError::Limited);
    }

    record.ts.push(now);
    let encoded = serde_json::to_vec(&record).map_err(io::Error::from)?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&encoded)?;
    file.flush()?;
    Ok(())
}

/// Hex SHA-256 of the key, used only as a filesystem-safe name.
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
