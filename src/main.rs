//! rename-headers: reverse proxy that renames upstream response headers.
//!
//! ```text
//!  Client ──▶ axum ──▶ SinkService ──▶ RenameHeaders ──▶ ProxyHandler ──▶ Upstream
//!  Client ◀── hyper ◀── StreamingSink ◀── RenameWriter (rename at commit) ◀──┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rename_headers::config::{load_config, AppConfig};
use rename_headers::http::HttpServer;
use rename_headers::lifecycle::{signals, Shutdown};
use rename_headers::observability::logging;

#[derive(Parser)]
#[command(name = "rename-headers")]
#[command(about = "Reverse proxy that renames response headers", long_about = None)]
struct Cli {
    /// Path to the TOML (or .json) configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!("rename-headers v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        rules = config.rename.rename_data.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // Validate before binding so a bad rule set never receives traffic
    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
