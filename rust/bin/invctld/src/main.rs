//! `invctld` — the inventory control server.
//!
//! Usage:
//!   invctld -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/invctl/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use clap::Parser;
use tracing::info;

use config::ServerConfig;

/// Inventory control server.
#[derive(Parser, Debug)]
#[command(name = "invctld", about = "Inventory control server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    bootstrap::verify_config(&server_config)?;

    let services = bootstrap::open_services(&server_config)?;
    let app = routes::build_router(&services);

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("invctld listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
