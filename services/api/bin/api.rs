//! Main Entrypoint for the Vox API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and the credentials file.
//! 2. Initializing logging.
//! 3. Wiring the speech adapter and the credential store into shared state.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{error, info, warn};
use vox_api::{
    config::Config,
    router::{cors_layer, create_router},
    speech::{AzureSpeech, device},
    state::AppState,
    store::EnvFileStore,
};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    if !config.credentials.is_configured() {
        warn!("Speech credentials are not configured. Recognition and synthesis are disabled until a client supplies them.");
    }

    // --- 3. Initialize Shared Services ---
    let speech = Arc::new(AzureSpeech::new(
        device::default_device(),
        config.speech_language.clone(),
        Duration::from_secs(config.record_seconds),
    ));
    let store = Arc::new(EnvFileStore::new(config.credentials_path.clone()));
    let app_state = Arc::new(AppState::new(config.clone(), speech, store));

    // --- 4. Create Router and Apply Middleware ---
    let app = create_router(app_state).layer(cors_layer(&config.allowed_origins));

    // --- 5. Start Server ---
    info!(
        bind_address = %config.bind_address,
        region = %config.credentials.region,
        speech_configured = config.credentials.is_configured(),
        credentials_path = %config.credentials_path.display(),
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
