//! Connection token gateway
//!
//! Authorizes browser clients, builds a per-session remote desktop
//! connection descriptor and hands it out encrypted, for the downstream
//! tunnel to decrypt. One process fronts many nodes addressed as
//! `/node/<server>/<port>/`.

mod config;

use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use guacgate_api::{ApiServer, ApiServerConfig};
use guacgate_listener::ListenMode;
use guacgate_proto::CIPHER_NAME;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Connection token gateway for a remote desktop tunnel
#[derive(Parser, Debug)]
#[command(name = "guacgate")]
#[command(about = "Issue encrypted remote desktop connection tokens", long_about = None)]
#[command(version)]
struct Cli {
    /// Connection config file name (e.g. guacd_rdp.json)
    config_file: String,

    /// Directory holding the connection config and credentials files
    #[arg(long, env = "script_path")]
    script_path: PathBuf,

    /// Inherited listening socket descriptor, or "use-insecure-testing-port"
    #[arg(long, env = "SPANK_ISO_NETNS_LISTENING_FD_0", default_value = "-1")]
    listening_fd: String,

    /// Port to bind in insecure testing mode (default 8080)
    #[arg(long, env = "SPANK_ISO_NETNS_LISTENING_PORT_0")]
    listening_port: Option<String>,

    /// Host to bind in insecure testing mode
    #[arg(long, env = "GUACGATE_BIND_HOST", default_value = "0.0.0.0")]
    bind_host: String,

    /// Static asset directory (default: <script_path>/public)
    #[arg(long, env = "GUACGATE_PUBLIC_DIR")]
    public_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Parse the command line, exiting with status 1 on usage errors
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli();

    // Initialize logging
    init_logging(&cli.log_level)?;

    let span = info_span!("gateway", config = %cli.config_file);
    let result = run(cli).instrument(span).await;

    if let Err(ref e) = result {
        error!("{:#}", e);
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    info!("Listening descriptor: {}", cli.listening_fd);
    if let Some(ref port) = cli.listening_port {
        info!("Listening port: {}", port);
    }
    info!("Script path: {}", cli.script_path.display());

    let base_dir = config::resolve_base_dir(&cli.script_path)?;
    let gateway = config::load(&base_dir, &cli.config_file)?;

    // Settings the tunnel is launched with; it decrypts our tokens with the same key
    info!(
        "Tunnel settings: guacd port {}, cipher {}, log level {}",
        gateway.connection.guacd.port, CIPHER_NAME, gateway.connection.log_level
    );

    // Configuration is complete before any socket is touched
    let mode = ListenMode::select(
        &cli.listening_fd,
        cli.listening_port.as_deref(),
        &cli.bind_host,
    )
    .context("Invalid listening configuration")?;
    let listener = mode.bind().await.context("Error starting server")?;

    let public_dir = cli.public_dir.unwrap_or_else(|| base_dir.join("public"));
    let server = ApiServer::new(ApiServerConfig { public_dir }, gateway);

    server.serve(listener, shutdown_signal()).await?;

    info!("Gateway stopped");
    Ok(())
}

fn init_logging(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
