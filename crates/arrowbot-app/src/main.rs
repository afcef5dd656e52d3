//! Arrowbot application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration (file, env, flags)
//! 2. Initialize tracing
//! 3. Wire every configured collaborator into the chat orchestrator
//! 4. Start the axum REST API server

mod cli;
mod wiring;

use std::time::Duration;

use clap::Parser;

use arrowbot_api::routes;
use arrowbot_api::state::AppState;
use arrowbot_core::config::ArrowConfig;

use crate::cli::CliArgs;

/// Interval between sweeps of expired in-process cache entries.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ArrowConfig::load_or_default(&config_file);
    config.apply_env();
    args.apply(&mut config);

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Arrowbot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let services = wiring::build_services(&config).await;

    if let Some(memory) = services.memory.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                let purged = memory.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Expired cache entries removed");
                }
            }
        });
    }

    let state = AppState::new(
        services.orchestrator,
        services.limiter,
        config.general.rate_limit_per_window,
    );

    if let Err(e) = routes::start_server(&config, state).await {
        tracing::error!(error = %e, "API server stopped");
        return Err(e.into());
    }

    Ok(())
}
