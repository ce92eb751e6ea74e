use anyhow::{Context, Result};
use clap::Parser;
use ragbridge::{api, config, logging, state::AppState};
use std::path::PathBuf;
use tokio::net::TcpListener;

/// Gateway between the browser UI, the retrieval service, and the language model.
#[derive(Parser)]
#[command(name = "ragbridge", version)]
struct Cli {
    /// Port to listen on (overrides `PORT`).
    #[arg(long)]
    port: Option<u16>,
    /// Directory with the built browser UI (overrides `RAGBRIDGE_FRONTEND_DIR`).
    #[arg(long)]
    frontend_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load_config().context("failed to load configuration")?;
    let _log_guard = logging::init_tracing(&config);

    if cli.port.is_some() {
        config.server_port = cli.port;
    }
    if cli.frontend_dir.is_some() {
        config.frontend_dir = cli.frontend_dir;
    }

    let state = AppState::from_config(&config).context("failed to build upstream clients")?;
    let app = api::create_router(state, config.frontend_dir.as_deref());

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("failed to bind listener")?;
    tracing::info!(
        ragie_configured = config.ragie_configured(),
        openai_configured = config.openai_configured(),
        "Listening on http://0.0.0.0:{}",
        port
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;
    Ok(())
}

async fn bind_listener(requested: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = requested {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = config::DEFAULT_SERVER_PORT..=3099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 3001-3099",
    ))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
