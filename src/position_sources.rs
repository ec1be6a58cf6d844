//! Position feed abstraction
//!
//! The tracker consumes one batch of reports per cycle. Batches come from:
//! - Production: polling a readsb/tar1090 `aircraft.json` over HTTP
//! - Testing and offline replay: a file of newline-delimited snapshots
//!
//! Both speak the readsb JSON format, converted by [`AircraftJson::to_batch`].
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::position::{PositionBatch, PositionReport, PositionTime};

/// Top level of a readsb `aircraft.json`
#[derive(Debug, Clone, Deserialize)]
pub struct AircraftJson {
    /// Receiver clock at the time of writing (unix seconds)
    pub now: Option<f64>,
    #[serde(default)]
    pub aircraft: Vec<AircraftEntry>,
}

/// One aircraft entry; only the fields the tracker needs
#[derive(Debug, Clone, Deserialize)]
pub struct AircraftEntry {
    pub hex: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Seconds since the position was last updated
    pub seen_pos: Option<f64>,
    /// ICAO type designator from the aircraft database
    #[serde(rename = "t")]
    pub type_code: Option<String>,
    pub wtc: Option<String>,
    pub category: Option<String>,
}

impl AircraftJson {
    /// Convert to a batch keyed by lowercase hex id.
    ///
    /// The position timestamp is `now - seen_pos` rounded to 0.1 s, so the
    /// same fix delivered in consecutive snapshots yields the same token.
    pub fn to_batch(&self) -> PositionBatch {
        self.aircraft
            .iter()
            .map(|entry| {
                let position = match (entry.lon, entry.lat) {
                    (Some(lon), Some(lat)) => Some((lon, lat)),
                    _ => None,
                };
                let position_time = match (self.now, entry.seen_pos) {
                    (Some(now), Some(seen_pos)) => {
                        Some(PositionTime::Seconds(
                            ((now - seen_pos) * 10.0).round() / 10.0,
                        ))
                    }
                    _ => None,
                };
                let report = PositionReport {
                    position,
                    position_age_secs: entry.seen_pos,
                    position_time,
                    type_code: entry.type_code.clone(),
                    weight_class: entry.wtc.clone(),
                    category: entry.category.clone(),
                };
                (entry.hex.trim().to_lowercase(), report)
            })
            .collect()
    }
}

/// Trait for sources of position batches
#[async_trait]
pub trait PositionSource: Send {
    /// Get the next batch
    ///
    /// Returns:
    /// - `Ok(Some(batch))` - Next batch available
    /// - `Ok(None)` - Source exhausted
    /// - `Err(e)` - This poll failed; the caller may try again next cycle
    async fn next_batch(&mut self) -> Result<Option<PositionBatch>>;
}

/// Polls an `aircraft.json` URL; never exhausted
pub struct HttpPositionSource {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpPositionSource {
    pub fn new(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PositionSource for HttpPositionSource {
    async fn next_batch(&mut self) -> Result<Option<PositionBatch>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned {}", self.url, status));
        }

        let snapshot: AircraftJson = response
            .json()
            .await
            .with_context(|| format!("Failed to parse aircraft list from {}", self.url))?;

        debug!(
            "Fetched {} aircraft from {}",
            snapshot.aircraft.len(),
            self.url
        );
        Ok(Some(snapshot.to_batch()))
    }
}

/// Replays recorded `aircraft.json` snapshots, one JSON document per line
///
/// Blank lines are skipped; malformed lines are logged and skipped.
pub struct ReplayPositionSource {
    reader: BufReader<File>,
    line_buffer: String,
    batches_read: usize,
}

impl ReplayPositionSource {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .await
            .with_context(|| format!("Failed to open replay file {:?}", path.as_ref()))?;
        debug!("Opened replay source from: {:?}", path.as_ref());

        Ok(Self {
            reader: BufReader::new(file),
            line_buffer: String::new(),
            batches_read: 0,
        })
    }

    pub fn batches_read(&self) -> usize {
        self.batches_read
    }
}

#[async_trait]
impl PositionSource for ReplayPositionSource {
    async fn next_batch(&mut self) -> Result<Option<PositionBatch>> {
        loop {
            self.line_buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes_read == 0 {
                return Ok(None);
            }

            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<AircraftJson>(line) {
                Ok(snapshot) => {
                    self.batches_read += 1;
                    return Ok(Some(snapshot.to_batch()));
                }
                Err(e) => {
                    warn!("Skipping malformed replay line: {}", e);
                }
            }
        }
    }
}
