//! Rotated audit log retention.
//!
//! Only files named `monitor-YYYYMMDD.log` are candidates; the undated
//! `monitor.log` and anything else in the directory are never touched.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

const SECS_PER_DAY: u64 = 86_400;

/// Whether `name` is a rotated log file.
pub fn is_rotated_log(name: &str) -> bool {
    name.strip_prefix("monitor-")
        .and_then(|rest| rest.strip_suffix(".log"))
        .is_some_and(|date| date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()))
}

/// Delete rotated logs last modified more than `retention_days` ago.
///
/// Returns the number of files removed. Errors are skipped: a file that
/// cannot be inspected or removed is left for the next sweep.
pub fn sweep(dir: &Path, retention_days: u64) -> usize {
    sweep_before(dir, retention_days, SystemTime::now())
}

pub fn sweep_before(dir: &Path, retention_days: u64, now: SystemTime) -> usize {
    if retention_days == 0 {
        return 0;
    }
    // A window too large to represent keeps everything.
    let Some(cutoff) = retention_days
        .checked_mul(SECS_PER_DAY)
        .and_then(|secs| now.checked_sub(Duration::from_secs(secs)))
    else {
        return 0;
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_rotated_log) {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified < cutoff && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }

    if removed > 0 {
        tracing::info!(dir = %dir.display(), removed, "Expired audit logs removed");
    }
    removed
}
