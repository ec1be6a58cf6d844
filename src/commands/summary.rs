use anyhow::Result;
use chrono::Utc;
use co2track::authoritative::{AuthoritativeCell, AuthoritativeClient};
use co2track::co2_tracker::{SessionAggregate, SummarySource, reconcile};
use co2track::fallback_store::{FallbackStore, JsonFileStore};
use co2track::format::{format_co2, format_distance, format_source};
use co2track::tracker_config::TrackerConfigFile;

use super::http_client;

/// One-shot: fetch the authoritative totals once and print the reconciled summary
pub async fn handle_summary(config: TrackerConfigFile) -> Result<()> {
    let persisted = JsonFileStore::new(&config.fallback_path).load();

    let authoritative = AuthoritativeCell::new();
    if let Some(url) = &config.authoritative_url {
        let client =
            AuthoritativeClient::new(http_client()?, url, config.intervals.fetch_timeout());
        authoritative.refresh(&client).await;
    }

    let snapshot = authoritative.snapshot().await;
    let summary = reconcile(&SessionAggregate::default(), &persisted, &snapshot);

    println!("CO2:      {}", format_co2(summary.all_time_co2_kg));
    println!("Distance: {}", format_distance(summary.all_time_distance_km));
    println!("Aircraft: {}", summary.all_time_count);
    println!("Source:   {}", format_source(&summary, Utc::now()));
    if summary.source == SummarySource::Authoritative
        && let Some(since) = snapshot.value.as_ref().and_then(|v| v.since.as_deref())
    {
        println!("Since:    {}", since);
    }
    Ok(())
}
