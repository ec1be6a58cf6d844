use anyhow::{Context, Result};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::info;

/// Install the Prometheus recorder
/// Returns a handle that renders the current metrics for scraping
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        // Cycle duration buckets: 1ms .. 5s
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "co2track.cycle.duration_seconds".to_string(),
            ),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .context("Failed to set buckets for co2track.cycle.duration_seconds")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Background task to update process metrics every 5 seconds
pub async fn process_metrics_task() {
    let start_time = Instant::now();

    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);

        #[cfg(target_os = "linux")]
        {
            if let Ok(status) = std::fs::read_to_string("/proc/self/status")
                && let Some(line) = status.lines().find(|line| line.starts_with("VmRSS:"))
                && let Some(kb_str) = line.split_whitespace().nth(1)
                && let Ok(kb) = kb_str.parse::<f64>()
            {
                metrics::gauge!("process.memory.bytes").set(kb * 1024.0);
            }
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

/// Initialize tracker metrics to zero so they appear in Prometheus before any event
pub fn initialize_tracker_metrics() {
    // Tracker
    metrics::counter!("co2track.cycle.total").absolute(0);
    metrics::counter!("co2track.cycle.reports_total").absolute(0);
    metrics::counter!("co2track.cycle.moved_total").absolute(0);
    metrics::counter!("co2track.cycle.jumps_total").absolute(0);
    metrics::counter!("co2track.cycle.stale_total").absolute(0);
    metrics::counter!("co2track.cycle.unresolved_total").absolute(0);
    metrics::counter!("co2track.tracks.evicted_total").absolute(0);
    metrics::gauge!("co2track.tracks.active").set(0.0);
    metrics::gauge!("co2track.session.distance_km").set(0.0);
    metrics::gauge!("co2track.session.co2_kg").set(0.0);
    metrics::gauge!("co2track.session.count").set(0.0);

    // Position feed
    metrics::counter!("co2track.feed.poll_error_total").absolute(0);

    // Authoritative totals
    metrics::counter!("co2track.authoritative.fetch_ok_total").absolute(0);
    metrics::counter!("co2track.authoritative.fetch_error_total").absolute(0);
    metrics::gauge!("co2track.authoritative.available").set(0.0);

    // Fallback store
    metrics::counter!("co2track.fallback.saved_total").absolute(0);
    metrics::counter!("co2track.fallback.save_error_total").absolute(0);
}

/// Serve `/metrics` on the given port until the listener fails
pub async fn start_metrics_server(handle: PrometheusHandle, port: u16) -> Result<()> {
    tokio::spawn(process_metrics_task());

    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server on {}", addr))?;
    info!("Metrics server listening on http://{}/metrics", addr);

    axum::serve(listener, app)
        .await
        .context("Metrics server failed")
}
