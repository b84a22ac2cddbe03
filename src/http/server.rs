//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the form endpoint
//! - Wire up middleware (tracing, body limit, hardening headers)
//! - Bind server to listener
//! - Run the retention sweeper next to the server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::http::handler::{reject_method, submit};
use crate::lifecycle::shutdown::{wait, Shutdown};
use crate::lifecycle::startup::Prepared;
use crate::mail::MailTransport;
use crate::pipeline::Dispatcher;
use crate::security::headers::{no_store_layer, nosniff_layer};
use crate::storage::RuntimeDirs;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub dispatcher: Dispatcher,
}

/// HTTP server for the contact endpoint.
pub struct HttpServer {
    router: Router,
    config: Arc<RelayConfig>,
    dispatcher: Dispatcher,
}

impl HttpServer {
    /// Create a server from prepared startup state.
    pub fn new(prepared: Prepared) -> Self {
        Self::with_transport(prepared.config, prepared.dirs, prepared.transport)
    }

    /// Create a server with an explicit delivery transport.
    pub fn with_transport(
        config: Arc<RelayConfig>,
        dirs: RuntimeDirs,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let dispatcher = Dispatcher::new(config.clone(), dirs, transport);
        let state = AppState {
            config: config.clone(),
            dispatcher: dispatcher.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            dispatcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route(
                &config.endpoint.path,
                post(submit).fallback(reject_method),
            )
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(nosniff_layer())
            .layer(no_store_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Router without a listener, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoint = %self.config.endpoint.path,
            "HTTP server starting"
        );

        let sweeper = self.dispatcher.monitor().spawn_sweeper(shutdown.subscribe());

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(wait(shutdown.subscribe()))
            .await?;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
