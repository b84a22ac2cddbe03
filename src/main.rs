use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use contact_relay::lifecycle::startup;
use contact_relay::observability::{logging, metrics};
use contact_relay::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "contact-relay")]
#[command(about = "Contact form relay", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CONTACT_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A config that fails to load still gets its error logged, with defaults.
    let config = match startup::load(args.config.as_deref()) {
        Ok(config) => {
            logging::init(&config.observability);
            config
        }
        Err(e) => {
            logging::init(&Default::default());
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    tracing::info!("contact-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let prepared = startup::prepare(config)?;

    if prepared.config.observability.metrics_enabled {
        if let Ok(addr) = prepared.config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %prepared.config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&prepared.config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    HttpServer::new(prepared).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
