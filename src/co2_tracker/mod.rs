//! Per-aircraft distance and CO₂ accumulation
//!
//! [`Co2Tracker`] owns every track plus the session aggregate. Each cycle the
//! runner hands it the latest batch of position reports; the tracker filters
//! stale, duplicate, teleporting and jittering fixes, accrues genuine movement
//! and then evicts aircraft that have not been seen for a while.

mod aggregates;
mod track;

pub use aggregates::{
    AuthoritativeAggregate, AuthoritativeSnapshot, PersistedAggregate, ReportedSummary,
    SessionAggregate, SummarySource, Totals, reconcile,
};
pub use track::EntityTrack;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::emission_factors::ResolvedFactor;
use crate::geometry::haversine_km;
use crate::position::{PositionBatch, PositionReport};

/// Filtering thresholds for incoming fixes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Positions older than this (seconds since upstream update) are ignored
    pub stale_position_secs: f64,
    /// A single step longer than this is a glitch, not movement
    pub max_jump_km: f64,
    /// Steps at or below this are positional noise
    pub min_move_km: f64,
    /// Tracks unseen for longer than this are evicted
    pub cleanup_max_age_secs: u64,
}

/// Largest cleanup age accepted from configuration (about 31 700 years)
pub const MAX_CLEANUP_AGE_SECS: u64 = 1_000_000_000_000;

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stale_position_secs: 120.0,
            max_jump_km: 50.0,
            min_move_km: 0.01,
            cleanup_max_age_secs: 3600,
        }
    }
}

impl Thresholds {
    /// Cleanup age as a duration, saturating at the largest representable span
    pub fn cleanup_max_age(&self) -> chrono::Duration {
        i64::try_from(self.cleanup_max_age_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Reject values that would make the filters meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.stale_position_secs.is_finite() && self.stale_position_secs >= 0.0) {
            bail!(
                "stale_position_secs must be a non-negative number, got {}",
                self.stale_position_secs
            );
        }
        if !(self.min_move_km.is_finite() && self.min_move_km >= 0.0) {
            bail!(
                "min_move_km must be a non-negative number, got {}",
                self.min_move_km
            );
        }
        if !(self.max_jump_km.is_finite() && self.max_jump_km > self.min_move_km) {
            bail!(
                "max_jump_km must be greater than min_move_km ({}), got {}",
                self.min_move_km,
                self.max_jump_km
            );
        }
        if self.cleanup_max_age_secs == 0 || self.cleanup_max_age_secs > MAX_CLEANUP_AGE_SECS {
            bail!(
                "cleanup_max_age_secs must be between 1 and {}, got {}",
                MAX_CLEANUP_AGE_SECS,
                self.cleanup_max_age_secs
            );
        }
        Ok(())
    }
}

/// What happened to a single report
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// No position in the report
    MissingPosition,
    /// Position too old upstream
    StalePosition,
    /// First report for this aircraft; baseline recorded
    NewTrack,
    /// Same fix as the stored baseline
    Duplicate,
    /// Track had no baseline; this position became it
    Baseline,
    /// Implausible step; rebased without accrual
    Jump { distance_km: f64 },
    /// Step below the movement threshold; rebased without accrual
    Noise { distance_km: f64 },
    /// Genuine movement; `co2_kg` is `None` when no factor resolved
    Moved {
        distance_km: f64,
        co2_kg: Option<f64>,
    },
}

/// Per-cycle counters, for logging and metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub reports: usize,
    pub missing_position: usize,
    pub stale_position: usize,
    pub new_tracks: usize,
    pub duplicates: usize,
    pub baselines: usize,
    pub jumps: usize,
    pub noise: usize,
    pub moved: usize,
    pub unresolved: usize,
    pub evicted: usize,
}

impl CycleStats {
    fn record(&mut self, outcome: &ReportOutcome) {
        self.reports += 1;
        match outcome {
            ReportOutcome::MissingPosition => self.missing_position += 1,
            ReportOutcome::StalePosition => self.stale_position += 1,
            ReportOutcome::NewTrack => self.new_tracks += 1,
            ReportOutcome::Duplicate => self.duplicates += 1,
            ReportOutcome::Baseline => self.baselines += 1,
            ReportOutcome::Jump { .. } => self.jumps += 1,
            ReportOutcome::Noise { .. } => self.noise += 1,
            ReportOutcome::Moved { co2_kg, .. } => {
                self.moved += 1;
                if co2_kg.is_none() {
                    self.unresolved += 1;
                }
            }
        }
    }
}

/// Read-only view of one tracked aircraft
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionView {
    pub hex: String,
    pub distance_km: f64,
    pub co2_kg: f64,
    pub type_code: Option<String>,
    pub weight_class: Option<String>,
    pub category: Option<String>,
    pub factor: Option<ResolvedFactor>,
    pub last_seen_at: DateTime<Utc>,
}

/// Owns all per-aircraft tracks and the session aggregate
#[derive(Debug, Default)]
pub struct Co2Tracker {
    thresholds: Thresholds,
    tracks: HashMap<String, EntityTrack>,
    /// Every hex seen this process lifetime; survives track eviction
    seen: HashSet<String>,
    session: SessionAggregate,
}

impl Co2Tracker {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            ..Default::default()
        }
    }

    pub fn session(&self) -> SessionAggregate {
        self.session
    }

    pub fn tracked_aircraft_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, hex: &str) -> Option<&EntityTrack> {
        self.tracks.get(hex)
    }

    /// Run one full cycle: process the batch, then evict stale tracks
    pub fn process_cycle(&mut self, batch: &PositionBatch, now: DateTime<Utc>) -> CycleStats {
        let mut stats = CycleStats::default();

        for (hex, report) in batch {
            let outcome = self.process_report(hex, report, now);
            trace!("{}: {:?}", hex, outcome);
            stats.record(&outcome);
        }

        stats.evicted = self.reap_stale(now);
        self.record_metrics(&stats);

        debug!(
            "cycle: reports={} moved={} jumps={} noise={} duplicates={} stale={} new={} evicted={} tracked={}",
            stats.reports,
            stats.moved,
            stats.jumps,
            stats.noise,
            stats.duplicates,
            stats.stale_position,
            stats.new_tracks,
            stats.evicted,
            self.tracks.len()
        );

        stats
    }

    /// Apply a single report to the aircraft's track
    pub fn process_report(
        &mut self,
        hex: &str,
        report: &PositionReport,
        now: DateTime<Utc>,
    ) -> ReportOutcome {
        let Some((lon, lat)) = report.position else {
            return ReportOutcome::MissingPosition;
        };
        if let Some(age) = report.position_age_secs
            && age > self.thresholds.stale_position_secs
        {
            return ReportOutcome::StalePosition;
        }

        if !self.seen.contains(hex) {
            self.seen.insert(hex.to_string());
            self.session.count += 1;
        }

        let Some(track) = self.tracks.get_mut(hex) else {
            self.tracks
                .insert(hex.to_string(), EntityTrack::new(report, lat, lon, now));
            return ReportOutcome::NewTrack;
        };

        track.last_seen_at = now;
        if track.is_duplicate(report) {
            return ReportOutcome::Duplicate;
        }

        let Some((last_lat, last_lon)) = track.last_position else {
            track.rebase(lat, lon, report.position_time.clone());
            return ReportOutcome::Baseline;
        };

        let distance_km = haversine_km(last_lat, last_lon, lat, lon);

        let outcome = if distance_km > self.thresholds.max_jump_km {
            debug!(
                "{}: rejecting {:.1} km jump from ({:.4}, {:.4}) to ({:.4}, {:.4})",
                hex, distance_km, last_lat, last_lon, lat, lon
            );
            ReportOutcome::Jump { distance_km }
        } else if distance_km > self.thresholds.min_move_km {
            track.merge_classification(report);
            let co2_kg = track.accrue(distance_km);
            self.session.distance_km += distance_km;
            if let Some(co2) = co2_kg {
                self.session.co2_kg += co2;
            }
            ReportOutcome::Moved {
                distance_km,
                co2_kg,
            }
        } else {
            ReportOutcome::Noise { distance_km }
        };

        track.rebase(lat, lon, report.position_time.clone());
        outcome
    }

    /// Evict tracks not seen within the cleanup threshold
    ///
    /// Their totals are already part of the session aggregate, and the
    /// distinct count is kept separately, so nothing else changes.
    pub fn reap_stale(&mut self, now: DateTime<Utc>) -> usize {
        let max_age = self.thresholds.cleanup_max_age();

        let mut removed_count = 0;
        self.tracks.retain(|hex, track| {
            if track.is_stale(now, max_age) {
                trace!(
                    "Removing stale track for {} (last seen {} minutes ago)",
                    hex,
                    now.signed_duration_since(track.last_seen_at).num_minutes()
                );
                removed_count += 1;
                false
            } else {
                true
            }
        });

        if removed_count > 0 {
            debug!("Evicted {} stale tracks", removed_count);
        }
        removed_count
    }

    /// Selected-aircraft query; `None` if the aircraft is not tracked
    pub fn selection(&self, hex: &str) -> Option<SelectionView> {
        let track = self.tracks.get(hex)?;
        Some(SelectionView {
            hex: hex.to_string(),
            distance_km: track.distance_km,
            co2_kg: track.co2_kg,
            type_code: track.type_code.clone(),
            weight_class: track.weight_class.clone(),
            category: track.category.clone(),
            factor: track.emission_factor(),
            last_seen_at: track.last_seen_at,
        })
    }

    /// Reported all-time totals given the other two sources
    pub fn summary(
        &self,
        persisted: &PersistedAggregate,
        authoritative: &AuthoritativeSnapshot,
    ) -> ReportedSummary {
        reconcile(&self.session, persisted, authoritative)
    }

    fn record_metrics(&self, stats: &CycleStats) {
        metrics::counter!("co2track.cycle.total").increment(1);
        metrics::counter!("co2track.cycle.reports_total").increment(stats.reports as u64);
        metrics::counter!("co2track.cycle.moved_total").increment(stats.moved as u64);
        metrics::counter!("co2track.cycle.jumps_total").increment(stats.jumps as u64);
        metrics::counter!("co2track.cycle.stale_total").increment(stats.stale_position as u64);
        metrics::counter!("co2track.cycle.unresolved_total").increment(stats.unresolved as u64);
        metrics::counter!("co2track.tracks.evicted_total").increment(stats.evicted as u64);
        metrics::gauge!("co2track.tracks.active").set(self.tracks.len() as f64);
        metrics::gauge!("co2track.session.distance_km").set(self.session.distance_km);
        metrics::gauge!("co2track.session.co2_kg").set(self.session.co2_kg);
        metrics::gauge!("co2track.session.count").set(self.session.count as f64);
    }
}
