//! Veil server binary.
//!
//! # Usage
//!
//! ```bash
//! VEIL_MASTER_SECRET=... veil-server --bind 0.0.0.0:8001
//! ```
//!
//! The master secret is required; the process refuses to start without it.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use veil_core::{EncryptionService, MasterSecret};
use veil_server::{AppState, MemoryStore, SharedSecretVerifier, router};

/// Veil chat server
#[derive(Parser, Debug)]
#[command(name = "veil-server")]
#[command(about = "Per-scope encrypted chat server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8001")]
    bind: String,

    /// Derived-key cache capacity (0 disables caching)
    #[arg(long, default_value = "1024")]
    key_cache_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Veil server starting");

    // Fatal without the secret; there is deliberately no fallback default.
    let master_secret = MasterSecret::new(
        std::env::var("VEIL_MASTER_SECRET").unwrap_or_default().into_bytes(),
    )?;

    let auth_secret = match std::env::var("VEIL_AUTH_SECRET") {
        Ok(secret) if !secret.is_empty() => secret.into_bytes(),
        _ => {
            tracing::warn!("VEIL_AUTH_SECRET not set - deriving token secret from master secret");
            tracing::warn!("Set a dedicated auth secret for production use");
            master_secret.as_bytes().to_vec()
        },
    };

    let encryption =
        EncryptionService::with_cache_capacity(master_secret, args.key_cache_capacity);
    let state = AppState::new(
        encryption,
        Arc::new(SharedSecretVerifier::new(auth_secret)),
        Arc::new(MemoryStore::new()),
    );

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
