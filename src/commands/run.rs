use anyhow::{Context, Result};
use co2track::authoritative::{AuthoritativeCell, AuthoritativeClient};
use co2track::co2_tracker::Co2Tracker;
use co2track::fallback_store::{FallbackStore, JsonFileStore};
use co2track::position_sources::HttpPositionSource;
use co2track::runner::Runner;
use co2track::status_server::{StatusState, start_status_server};
use co2track::tracker_config::TrackerConfigFile;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{Instrument, error, info};

use super::http_client;

#[tracing::instrument(skip_all)]
pub async fn handle_run(config: TrackerConfigFile) -> Result<()> {
    co2track::metrics::initialize_tracker_metrics();

    // Metrics server starts after the zero-initialization above
    if let Some(port) = config.metrics_port {
        let handle = co2track::metrics::init_metrics()?;
        tokio::spawn(
            async move {
                if let Err(e) = co2track::metrics::start_metrics_server(handle, port).await {
                    error!("Metrics server stopped: {:#}", e);
                }
            }
            .instrument(tracing::info_span!("metrics_server")),
        );
    }

    let intervals = &config.intervals;
    let client = http_client()?;

    let store: Arc<dyn FallbackStore> = Arc::new(JsonFileStore::new(&config.fallback_path));
    let persisted = {
        let store = Arc::clone(&store);
        tokio::task::spawn_blocking(move || store.load())
            .await
            .context("Failed to load fallback totals")?
    };
    info!(
        "Fallback totals from {:?}: {:.1} kg CO2, {:.1} km, {} aircraft",
        config.fallback_path, persisted.co2_kg, persisted.distance_km, persisted.count
    );

    let authoritative = AuthoritativeCell::new();
    match &config.authoritative_url {
        Some(url) => authoritative.start_refresh(
            AuthoritativeClient::new(client.clone(), url, intervals.fetch_timeout()),
            intervals.refresh_secs,
        ),
        None => info!("No authoritative_url configured, reporting local totals only"),
    }

    let tracker = Arc::new(Mutex::new(Co2Tracker::new(config.thresholds.clone())));

    if let Some(addr) = config.status_listen {
        let state = StatusState {
            tracker: Arc::clone(&tracker),
            authoritative: authoritative.clone(),
            persisted,
        };
        tokio::spawn(
            async move {
                if let Err(e) = start_status_server(addr, state).await {
                    error!("Status server stopped: {:#}", e);
                }
            }
            .instrument(tracing::info_span!("status_server")),
        );
    }

    info!(
        "Polling {} every {} seconds",
        config.feed_url, intervals.cycle_secs
    );
    let source = HttpPositionSource::new(client, &config.feed_url, intervals.fetch_timeout());

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
            Err(e) => {
                error!("Unable to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let report = Runner::new(source, tracker, authoritative, store, persisted)
        .with_periods(
            Duration::from_secs(intervals.cycle_secs),
            Duration::from_secs(intervals.flush_secs),
        )
        .run_until(shutdown)
        .await;

    info!(
        "Stopped after {} cycles ({} poll errors): session {:.1} kg CO2 over {:.1} km from {} aircraft",
        report.cycles,
        report.poll_errors,
        report.session.co2_kg,
        report.session.distance_km,
        report.session.count
    );
    Ok(())
}
