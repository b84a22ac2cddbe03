//! Shared utilities for integration testing.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use contact_relay::config::schema::StorageConfig;
use contact_relay::config::RelayConfig;
use contact_relay::http::HttpServer;
use contact_relay::lifecycle::Shutdown;
use contact_relay::mail::{Delivery, DeliveryError, MailTransport, OutboundMessage};
use contact_relay::storage::RuntimeDirs;
use serde_json::Value;
use tokio::net::TcpListener;

/// Transport that keeps every message and optionally refuses delivery.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub fail: bool,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<Delivery, DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Rejected {
                status: "exit status: 75".into(),
                diagnostics: "queue unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(Delivery {
            transport: "recording",
            destination: message.to.clone(),
        })
    }
}

/// A relay listening on an ephemeral port with private storage.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub transport: Arc<RecordingTransport>,
    pub dirs: RuntimeDirs,
    shutdown: Shutdown,
    _tmp: tempfile::TempDir,
}

impl TestRelay {
    pub async fn start() -> Self {
        Self::start_with(RelayConfig::default(), RecordingTransport::default()).await
    }

    pub async fn start_with(mut config: RelayConfig, transport: RecordingTransport) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        config.storage = StorageConfig {
            runtime_dir: Some(tmp.path().to_path_buf()),
            app_dir_name: "relay".into(),
        };
        config.audit.daily_rotate = false;

        let dirs = RuntimeDirs::resolve(&config.storage).unwrap();
        let transport = Arc::new(transport);
        let server = HttpServer::with_transport(Arc::new(config), dirs.clone(), transport.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run(listener, server_shutdown).await;
        });

        Self {
            addr,
            transport,
            dirs,
            shutdown,
            _tmp: tmp,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/contact", self.addr)
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.transport.sent.lock().unwrap().clone()
    }

    pub fn audit_file(&self) -> PathBuf {
        self.dirs.monitor_dir().join("monitor.log")
    }

    /// Every audit line written so far, parsed.
    pub fn audit_events(&self) -> Vec<Value> {
        fs::read_to_string(self.audit_file())
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    pub fn audit_kinds(&self) -> Vec<String> {
        self.audit_events()
            .iter()
            .map(|e| e["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub fn valid_form() -> Vec<(&'static str, String)> {
    vec![
        ("name", "Teszt Elek".to_string()),
        ("email", "teszt@example.com".to_string()),
        ("phone", "+36 1 234 5678".to_string()),
        ("message", "Szia, érdeklődnék az árakról.".to_string()),
        ("website", String::new()),
    ]
}
