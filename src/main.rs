use anyhow::Context;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod artifacts;
mod frontend;
mod models;
mod routes;
mod server;

use models::WatchConfig;
use server::Server;

/// Start a HTTP server giving access to generated mapshots.
///
/// Shots are discovered under the data directory and rescanned periodically,
/// so new renders show up without a restart.
#[derive(Parser, Debug)]
#[command(name = "mapshot-serve", version)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "MAPSHOT_PORT", default_value_t = 8080)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "MAPSHOT_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Directory to look for mapshots in. Defaults to Factorio script-output.
    #[arg(long, env = "MAPSHOT_DATA_DIR", value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Directory with frontend files; a bundled index page is used otherwise
    #[arg(long, env = "MAPSHOT_FRONTEND_DIR", value_name = "DIR")]
    frontend: Option<PathBuf>,

    /// Base delay between two rescans, in milliseconds
    #[arg(long, default_value_t = 8000)]
    rescan_interval_ms: u64,

    /// Random extra delay added to each rescan, in milliseconds
    #[arg(long, default_value_t = 2000)]
    rescan_jitter_ms: u64,
}

impl Cli {
    fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            interval: Duration::from_millis(self.rescan_interval_ms),
            jitter: Duration::from_millis(self.rescan_jitter_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapshot_serve=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let watch = cli.watch_config();
    let base_dir = resolve_data_dir(cli.dir)?;
    let fallback = frontend::router(cli.frontend.as_deref());

    let server = Arc::new(
        Server::new(base_dir.clone(), fallback, watch)
            .with_context(|| format!("Unable to scan {}", base_dir.display()))?,
    );
    info!("Serving data from {}", server.base_dir().display());

    let addr = SocketAddr::new(cli.host, cli.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to listen on {}", addr))?;
    info!("listening on {}", addr);

    let cancel = CancellationToken::new();
    let watcher = server.spawn_watcher(cancel.clone());

    axum::serve(listener, server::router(server))
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    watcher.await?;
    info!("Server stopped");

    Ok(())
}

/// Data directory from the command line, or `~/.factorio/script-output`.
fn resolve_data_dir(dir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => dirs::home_dir()
            .map(|home| home.join(".factorio").join("script-output"))
            .context("Unable to locate home directory, use --dir"),
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            error!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
    cancel.cancel();
}
