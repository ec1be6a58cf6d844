//! Best-effort local store for totals from earlier runs
//!
//! Only consulted when the authoritative totals cannot be fetched. Nothing in
//! here ever fails loudly: a missing, unreadable or outdated record reads as
//! zero, and a failed write is logged and dropped.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::co2_tracker::PersistedAggregate;

/// Current on-disk record version
pub const RECORD_VERSION: u32 = 2;

/// Serialized form of the persisted aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(alias = "v")]
    version: u32,
    #[serde(rename = "co2Kg", alias = "co2", default)]
    co2_kg: f64,
    #[serde(rename = "distKm", alias = "dist", default)]
    dist_km: f64,
    #[serde(alias = "cnt", default)]
    count: u64,
}

impl From<&PersistedAggregate> for StoredRecord {
    fn from(totals: &PersistedAggregate) -> Self {
        Self {
            version: RECORD_VERSION,
            co2_kg: totals.co2_kg,
            dist_km: totals.distance_km,
            count: totals.count,
        }
    }
}

fn decode_record(raw: &str) -> Result<PersistedAggregate> {
    let record: StoredRecord = serde_json::from_str(raw).context("Malformed record")?;
    if record.version != RECORD_VERSION {
        return Err(anyhow!(
            "Unsupported record version {} (expected {})",
            record.version,
            RECORD_VERSION
        ));
    }
    Ok(PersistedAggregate {
        distance_km: record.dist_km,
        co2_kg: record.co2_kg,
        count: record.count,
    })
}

fn encode_record(totals: &PersistedAggregate) -> Result<String> {
    serde_json::to_string(&StoredRecord::from(totals)).context("Failed to serialize record")
}

/// Durable get/set of the persisted aggregate; never raises
pub trait FallbackStore: Send + Sync {
    /// Load the persisted totals, or zero if there are none usable
    fn load(&self) -> PersistedAggregate;

    /// Replace the persisted totals; failures are swallowed
    fn save(&self, totals: &PersistedAggregate);
}

/// JSON file store with atomic replace
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_load(&self) -> Result<Option<PersistedAggregate>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", self.path)),
        };
        decode_record(&raw)
            .with_context(|| format!("Failed to decode {:?}", self.path))
            .map(Some)
    }

    /// Write to a temp file next to the target, then rename over it
    fn try_save(&self, totals: &PersistedAggregate) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let contents = encode_record(totals)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, contents)
            .with_context(|| format!("Failed to write {:?}", tmp_path))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", tmp_path, self.path))?;
        Ok(())
    }
}

impl FallbackStore for JsonFileStore {
    fn load(&self) -> PersistedAggregate {
        match self.try_load() {
            Ok(Some(totals)) => {
                debug!(
                    "Loaded fallback totals from {:?}: {:.1} kg, {:.1} km, {} aircraft",
                    self.path, totals.co2_kg, totals.distance_km, totals.count
                );
                totals
            }
            Ok(None) => {
                debug!("No fallback totals at {:?}, starting from zero", self.path);
                PersistedAggregate::default()
            }
            Err(e) => {
                warn!("Ignoring fallback totals: {:#}", e);
                PersistedAggregate::default()
            }
        }
    }

    fn save(&self, totals: &PersistedAggregate) {
        match self.try_save(totals) {
            Ok(()) => {
                metrics::counter!("co2track.fallback.saved_total").increment(1);
            }
            Err(e) => {
                debug!("Fallback totals not saved: {:#}", e);
                metrics::counter!("co2track.fallback.save_error_total").increment(1);
            }
        }
    }
}

/// In-memory store holding the serialized record
#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a raw serialized record
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.record.lock().ok().and_then(|record| record.clone())
    }
}

impl FallbackStore for MemoryStore {
    fn load(&self) -> PersistedAggregate {
        self.raw()
            .and_then(|raw| decode_record(&raw).ok())
            .unwrap_or_default()
    }

    fn save(&self, totals: &PersistedAggregate) {
        if let (Ok(encoded), Ok(mut record)) = (encode_record(totals), self.record.lock()) {
            *record = Some(encoded);
        }
    }
}
