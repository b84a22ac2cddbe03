//! Delivery transports.
//!
//! The relay hands a composed message to exactly one transport and only
//! learns success or failure plus diagnostic text. Diagnostics go to the
//! audit log, never to the client.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::RelayConfig;
use crate::mail::message::OutboundMessage;
use crate::storage::RuntimeDirs;

/// Delivery failure with the transport's diagnostic text.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("delivery I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport exited with {status}: {diagnostics}")]
    Rejected { status: String, diagnostics: String },
    #[error("{0}")]
    Storage(String),
}

/// Successful handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport name for the audit log.
    pub transport: &'static str,
    /// Where the message went: recipient, or dump file in development mode.
    pub destination: String,
}

/// External delivery primitive.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<Delivery, DeliveryError>;
}

/// Pipes messages to a sendmail-compatible binary.
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    program: PathBuf,
}

impl SendmailTransport {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl MailTransport for SendmailTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<Delivery, DeliveryError> {
        let program = self.program.display().to_string();
        let mut child = Command::new(&self.program)
            .arg("-i")
            .arg("-f")
            .arg(&message.envelope_sender)
            .arg("--")
            .arg(&message.to)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DeliveryError::Spawn {
                program: program.clone(),
                source,
            })?;

        // stdin is closed before waiting so the child sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(message.to_rfc5322().as_bytes()).await,
            None => Ok(()),
        };

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(DeliveryError::Rejected {
                status: output.status.to_string(),
                diagnostics: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        Ok(Delivery {
            transport: "sendmail",
            destination: message.to.clone(),
        })
    }
}

/// Development transport: writes the message to the dev directory.
#[derive(Debug, Clone)]
pub struct DevDumpTransport {
    dirs: RuntimeDirs,
}

impl DevDumpTransport {
    pub fn new(dirs: RuntimeDirs) -> Self {
        Self { dirs }
    }
}

#[async_trait]
impl MailTransport for DevDumpTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<Delivery, DeliveryError> {
        let dirs = self.dirs.clone();
        let dir = tokio::task::spawn_blocking(move || dirs.ensure_dev())
            .await
            .map_err(|e| DeliveryError::Storage(e.to_string()))?
            .map_err(|e| DeliveryError::Storage(e.to_string()))?;
        let file_name = format!(
            "contact_{}_{}.txt",
            Local::now().format("%Y%m%d_%H%M%S"),
            hex::encode(rand::random::<[u8; 4]>())
        );
        let path = dir.join(file_name);

        tokio::fs::write(&path, message.to_dump()).await?;
        tracing::debug!(path = %path.display(), "Message dumped (development mode)");

        Ok(Delivery {
            transport: "dev",
            destination: path.display().to_string(),
        })
    }
}

/// Transport for the configured mode.
pub fn from_config(config: &RelayConfig, dirs: &RuntimeDirs) -> Arc<dyn MailTransport> {
    if config.dev_mode {
        Arc::new(DevDumpTransport::new(dirs.clone()))
    } else {
        Arc::new(SendmailTransport::new(config.mail.sendmail_path.clone()))
    }
}
