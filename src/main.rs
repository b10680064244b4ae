//! Calendar Guard - warms the calendar dataset cache through the guarded client
//!
//! Loads configuration from the environment, prefetches the configured years
//! and logs a stats snapshot of every guard.

use anyhow::Context;
use serde_json::json;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use calendar_guard::{Config, DatasetClient};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the dataset client with its cache, breaker and throttler
/// 4. Prefetch the configured years, or stop early on Ctrl+C
/// 5. Log a stats snapshot and tear the guards down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calendar_guard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Calendar Guard");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        base_url = %config.client.base_url,
        years = ?config.prefetch_years,
        "Configuration loaded"
    );

    let client = DatasetClient::new(
        config.client.clone(),
        config.cache.clone(),
        config.breaker.clone(),
        config.throttle.clone(),
    )
    .context("Failed to build dataset client")?;

    tokio::select! {
        outcomes = client.prefetch(&config.prefetch_years) => {
            let loaded = outcomes.iter().filter(|(_, outcome)| outcome.is_ok()).count();
            for (year, outcome) in &outcomes {
                match outcome {
                    Ok(records) => info!(year, records, "Year cached"),
                    Err(e) => error!(year, error = %e, "Year unavailable"),
                }
            }
            info!(loaded, requested = outcomes.len(), "Prefetch finished");
        }
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, abandoning prefetch");
        }
    }

    let snapshot = json!({
        "cache": client.cache_stats(),
        "circuitBreaker": client.breaker_stats(),
        "throttler": client.throttle_stats(),
    });
    info!("Stats: {}", serde_json::to_string(&snapshot)?);

    client.shutdown();
    info!("Shutdown complete");
    Ok(())
}
