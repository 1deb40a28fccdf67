//! Entry point for the `gitwire-server` binary.

use anyhow::{Context, Result};
use clap::Parser;
use gitwire_auth::InMemoryCredentialStore;
use gitwire_server::api::{create_router, AppState};
use gitwire_server::config::ServerConfig;
use gitwire_server::health::HealthState;
use gitwire_server::observability::{init_logging, LogFormat};
use gitwire_storage::RepoStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Git Smart HTTP transport server.
#[derive(Parser, Debug)]
#[command(name = "gitwire-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file. Falls back to `GITWIRE_*` env vars
    /// and built-in defaults when omitted or missing.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let config = match &args.config {
        Some(path) if path.exists() => {
            let mut config = ServerConfig::from_file(path)
                .with_context(|| format!("loading config file {}", path.display()))?;
            config.merge_env()?;
            config
        }
        Some(path) => {
            anyhow::bail!("config file not found: {}", path.display());
        }
        None => ServerConfig::from_env()?,
    };

    config.validate_config()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(&config.logging.level, LogFormat::parse(&config.logging.format));

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.http.addr,
        "starting gitwire-server"
    );

    let health_state = HealthState::new();

    let repos = Arc::new(RepoStore::new());
    let auth = Arc::new(InMemoryCredentialStore::new());
    health_state.set_storage_healthy(true);

    let state = AppState {
        repos,
        auth,
        realm: config.auth.realm.clone(),
    };

    let app = create_router(state, health_state.clone(), config.http.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.http.addr)
        .await
        .with_context(|| format!("binding {}", config.http.addr))?;

    health_state.set_startup_complete(true);
    health_state.set_ready(true);

    tracing::info!(addr = %config.http.addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
