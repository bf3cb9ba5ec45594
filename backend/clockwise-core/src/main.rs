// src/main.rs
use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;
mod date_range;
mod directory;
mod error;
mod functions;
mod labels;
#[cfg(test)]
mod memory_store;
mod models;
mod navigation;
mod reporting;
mod roles;
mod supabase_client;
mod supabase_store;
mod timesheets;
mod validation;

use api::{build_router, AppState};
use config::AppConfig;
use labels::LabelCache;
use supabase_client::SupabaseClient;

#[derive(Parser, Debug)]
#[command(
    name = "clockwise-core",
    about = "Timesheet tracking and approval backend"
)]
struct Args {
    /// Overrides SERVER_HOST
    #[arg(long)]
    host: Option<String>,
    /// Overrides SERVER_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // --- Setup ---
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AppConfig::from_env()
        .context("Failed to load configuration (SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY are required)")?;
    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }
    info!("Configuration loaded. Backend: {}", config.supabase_url);

    // --- Backend client & shared state ---
    let client = SupabaseClient::new(config.supabase()).context("Failed to create Supabase client")?;
    let state = AppState {
        store: Arc::new(client),
        labels: LabelCache::new(config.label_cache_ttl()),
    };
    let app = build_router(state);

    // --- Run Web Server ---
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("Invalid server address")?;

    match config.tls_paths() {
        Some((cert_path, key_path)) => {
            let tls_config =
                match RustlsConfig::from_pem_file(PathBuf::from(cert_path), PathBuf::from(key_path))
                    .await
                {
                    Ok(config) => config,
                    Err(e) => {
                        error!("Failed to load TLS cert/key: {}", e);
                        return Err(e).context("TLS configuration error");
                    }
                };
            info!(
                "TLS configuration loaded from {} and {}",
                cert_path, key_path
            );
            info!("Listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
