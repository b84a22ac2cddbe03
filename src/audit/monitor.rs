//! Append-only audit log with daily rotation.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use fs2::FileExt;
use rand::Rng;
use tokio::sync::broadcast;

use crate::audit::event::AuditEvent;
use crate::audit::retention;
use crate::config::AuditConfig;

/// Best-effort audit writer.
///
/// Writes never fail the caller: errors are reported through `tracing` and
/// otherwise dropped.
#[derive(Debug, Clone)]
pub struct AuditMonitor {
    dir: PathBuf,
    config: AuditConfig,
}

impl AuditMonitor {
    pub fn new(dir: impl Into<PathBuf>, config: AuditConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn log_pii(&self) -> bool {
        self.config.log_pii
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Active log file for `date`.
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        if self.config.daily_rotate {
            self.dir.join(format!("monitor-{}.log", date.format("%Y%m%d")))
        } else {
            self.dir.join("monitor.log")
        }
    }

    pub fn current_file(&self) -> PathBuf {
        self.file_for(Local::now().date_naive())
    }

    /// Append one event on the blocking pool.
    pub async fn record(&self, event: AuditEvent) {
        if !self.config.enabled {
            return;
        }
        let monitor = self.clone();
        let kind = event.event;
        match tokio::task::spawn_blocking(move || monitor.append(&event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(event = kind.as_str(), error = %e, "Audit write failed");
            }
            Err(e) => {
                tracing::warn!(event = kind.as_str(), error = %e, "Audit task failed");
            }
        }
    }

    /// Append one event synchronously under an exclusive file lock.
    pub fn append(&self, event: &AuditEvent) -> io::Result<()> {
        let mut line = event.to_line().map_err(io::Error::from)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_file())?;
        file.lock_exclusive()?;
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        let _ = file.unlock();
        written
    }

    /// Run a retention sweep with the configured probability.
    pub async fn maybe_cleanup(&self) {
        if self.config.retention_days == 0 || !self.sample() {
            return;
        }
        self.cleanup().await;
    }

    /// Run a retention sweep now.
    pub async fn cleanup(&self) -> usize {
        let dir = self.dir.clone();
        let days = self.config.retention_days;
        tokio::task::spawn_blocking(move || retention::sweep(&dir, days))
            .await
            .unwrap_or(0)
    }

    fn sample(&self) -> bool {
        rand::thread_rng().gen::<f64>() < self.config.cleanup_probability
    }

    /// Periodic sweep task, if configured. Stops on shutdown.
    pub fn spawn_sweeper(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Option<tokio::task::JoinHandle<()>> {
        let interval_secs = self.config.sweep_interval_secs?;
        if self.config.retention_days == 0 {
            return None;
        }
        let monitor = self.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            tracing::info!(interval_secs, "Audit retention sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.cleanup().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Audit retention sweeper stopping");
                        break;
                    }
                }
            }
        }))
    }
}
