use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{LOCATION, ORIGIN};
use reqwest::redirect::Policy;

use contact_relay::audit::AuditMonitor;
use contact_relay::config::load_config;
use contact_relay::storage::RuntimeDirs;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Operator CLI for the contact relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print the resolved settings
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Delete audit logs older than the retention period
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Post a test submission to a running relay
    Submit {
        #[arg(short, long, default_value = "http://localhost:8080/contact")]
        url: String,
        #[arg(long)]
        origin: Option<String>,
        #[arg(long, default_value = "Test")]
        name: String,
        #[arg(long, default_value = "test@example.com")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "Test message from relay-cli")]
        message: String,
        /// Fill the honeypot field
        #[arg(long)]
        bot: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { config } => {
            let config = load_config(&config)?;
            println!("{}", toml::to_string_pretty(&config)?);
            let dirs = RuntimeDirs::resolve(&config.storage)?;
            println!("# runtime directory: {}", dirs.app_dir().display());
        }
        Commands::Sweep { config } => {
            let config = load_config(&config)?;
            let dirs = RuntimeDirs::resolve(&config.storage)?;
            let monitor = AuditMonitor::new(dirs.monitor_dir(), config.audit);
            let removed = monitor.cleanup().await;
            println!("Removed {} expired log file(s) from {}", removed, monitor.dir().display());
        }
        Commands::Submit {
            url,
            origin,
            name,
            email,
            phone,
            message,
            bot,
        } => {
            let client = reqwest::Client::builder()
                .redirect(Policy::none())
                .build()?;

            let website = if bot { "http://spam.example" } else { "" };
            let form = [
                ("name", name.as_str()),
                ("email", email.as_str()),
                ("phone", phone.as_str()),
                ("message", message.as_str()),
                ("website", website),
            ];

            let mut request = client.post(&url).form(&form);
            if let Some(origin) = origin {
                request = request.header(ORIGIN, origin);
            }
            let res = request.send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    println!("Status: {}", status);
    if let Some(id) = res.headers().get("x-request-id") {
        println!("Request ID: {}", id.to_str().unwrap_or_default());
    }
    if let Some(location) = res.headers().get(LOCATION) {
        println!("Location: {}", location.to_str().unwrap_or_default());
    }
    let body = res.text().await?;
    if !body.is_empty() {
        println!("{}", body);
    }
    if status.is_client_error() || status.is_server_error() {
        std::process::exit(1);
    }
    Ok(())
}
