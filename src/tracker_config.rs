use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::co2_tracker::Thresholds;

/// Timer periods for the daemon
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Intervals {
    /// Processing cycle (feed poll + tracker + reaper)
    pub cycle_secs: u64,
    /// Authoritative totals refresh
    pub refresh_secs: u64,
    /// Fallback store flush
    pub flush_secs: u64,
    /// Timeout for every outgoing HTTP request
    pub fetch_timeout_secs: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            cycle_secs: 5,
            refresh_secs: 10,
            flush_secs: 30,
            fetch_timeout_secs: 5,
        }
    }
}

impl Intervals {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Every period must be at least one second
    pub fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("cycle_secs", self.cycle_secs),
            ("refresh_secs", self.refresh_secs),
            ("flush_secs", self.flush_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
        ] {
            if secs == 0 {
                bail!("[intervals] {} must be at least 1", name);
            }
        }
        Ok(())
    }
}

/// Top-level configuration file structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfigFile {
    /// readsb/tar1090 `aircraft.json` URL
    pub feed_url: String,
    /// Collector daemon totals (`co2data.json`); local fallback only when unset
    pub authoritative_url: Option<String>,
    /// Where fallback totals are kept between runs
    pub fallback_path: PathBuf,
    /// Status HTTP server; disabled when unset
    pub status_listen: Option<SocketAddr>,
    /// Prometheus exporter port; disabled when unset
    pub metrics_port: Option<u16>,
    pub intervals: Intervals,
    pub thresholds: Thresholds,
}

impl Default for TrackerConfigFile {
    fn default() -> Self {
        Self {
            feed_url: "http://127.0.0.1/tar1090/data/aircraft.json".to_string(),
            authoritative_url: None,
            fallback_path: PathBuf::from("./co2track-state.json"),
            status_listen: None,
            metrics_port: None,
            intervals: Intervals::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl TrackerConfigFile {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: TrackerConfigFile =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        config
            .intervals
            .validate()
            .and_then(|()| config.thresholds.validate())
            .with_context(|| format!("Invalid configuration in {:?}", path))?;
        Ok(config)
    }

    /// Load config, using defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Resolve the config file path.
///
/// Priority:
/// 1. Explicit path (command line)
/// 2. `CO2TRACK_CONFIG` env var
/// 3. `/etc/co2track/co2track.toml` (production/staging)
/// 4. `./co2track.toml` (development)
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var("CO2TRACK_CONFIG") {
        return PathBuf::from(path);
    }

    match std::env::var("CO2TRACK_ENV").as_deref() {
        Ok("production") | Ok("staging") => PathBuf::from("/etc/co2track/co2track.toml"),
        _ => PathBuf::from("./co2track.toml"),
    }
}
