//! Client for the collector daemon's all-time totals (`co2data.json`)
//!
//! The daemon tracks every aircraft continuously and publishes its totals as
//! a small JSON document. Those numbers are preferred over anything computed
//! locally whenever they can be fetched.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{Instrument, debug, info, warn};

use crate::co2_tracker::{AuthoritativeAggregate, AuthoritativeSnapshot};

/// Fetches the authoritative aggregate document
#[derive(Clone)]
pub struct AuthoritativeClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl AuthoritativeClient {
    pub fn new(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and parse the document
    ///
    /// Any non-success status, transport error, timeout or malformed body is
    /// an error; callers treat them all the same way.
    pub async fn fetch(&self) -> Result<AuthoritativeAggregate> {
        let cache_buster = Utc::now().timestamp_millis().to_string();

        let response = self
            .client
            .get(&self.url)
            .query(&[("_", cache_buster.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned {}", self.url, status));
        }

        let aggregate: AuthoritativeAggregate = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", self.url))?;

        Ok(aggregate)
    }
}

/// Latest authoritative snapshot, shared between the refresh task and readers
#[derive(Clone, Default)]
pub struct AuthoritativeCell {
    inner: Arc<RwLock<AuthoritativeSnapshot>>,
}

impl AuthoritativeCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot
    pub async fn snapshot(&self) -> AuthoritativeSnapshot {
        self.inner.read().await.clone()
    }

    /// Apply the outcome of one fetch
    pub async fn apply(&self, result: Result<AuthoritativeAggregate>) {
        let mut snapshot = self.inner.write().await;
        let was_available = snapshot.available;

        match result {
            Ok(aggregate) => {
                debug!(
                    "Authoritative totals: {:.1} kg CO2, {:.1} km, {} aircraft",
                    aggregate.co2_kg, aggregate.dist_km, aggregate.count
                );
                snapshot.record_success(aggregate, Utc::now());
                if !was_available {
                    info!("Authoritative totals available");
                }
                metrics::counter!("co2track.authoritative.fetch_ok_total").increment(1);
            }
            Err(e) => {
                snapshot.record_failure();
                if was_available {
                    warn!("Authoritative totals unavailable, using local fallback: {:#}", e);
                } else {
                    debug!(
                        "Authoritative fetch failed ({} in a row): {:#}",
                        snapshot.consecutive_failures, e
                    );
                }
                metrics::counter!("co2track.authoritative.fetch_error_total").increment(1);
            }
        }

        metrics::gauge!("co2track.authoritative.available")
            .set(if snapshot.available { 1.0 } else { 0.0 });
    }

    /// Fetch once and apply the result
    pub async fn refresh(&self, client: &AuthoritativeClient) {
        let result = client.fetch().await;
        self.apply(result).await;
    }

    /// Start a background task refreshing the snapshot on a fixed period.
    ///
    /// The first fetch happens immediately. Completions are not sequenced
    /// against each other; the last one to finish wins.
    pub fn start_refresh(&self, client: AuthoritativeClient, interval_secs: u64) {
        let cell = self.clone();
        let url = client.url().to_string();
        tokio::spawn(
            async move {
                let mut interval =
                    tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

                loop {
                    interval.tick().await;
                    cell.refresh(&client).await;
                }
            }
            .instrument(tracing::info_span!("authoritative_refresh")),
        );
        info!(
            "Started authoritative refresh from {} (every {} seconds)",
            url, interval_secs
        );
    }
}
