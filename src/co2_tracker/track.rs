use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::emission_factors::{ResolvedFactor, resolve_emission_factor};
use crate::position::{PositionReport, PositionTime, non_empty};

/// Per-aircraft accumulated movement and emission state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTrack {
    /// Last accepted position (lat, lon); `None` until a baseline exists
    pub last_position: Option<(f64, f64)>,
    pub last_position_time: Option<PositionTime>,

    /// Cumulative distance, never decreases
    pub distance_km: f64,
    /// Cumulative CO₂, never decreases
    pub co2_kg: f64,

    pub type_code: Option<String>,
    pub weight_class: Option<String>,
    pub category: Option<String>,

    /// Wall clock time of the last processed report (for cleanup)
    pub last_seen_at: DateTime<Utc>,
}

impl EntityTrack {
    /// Create a track whose baseline is the report's position
    pub fn new(report: &PositionReport, lat: f64, lon: f64, now: DateTime<Utc>) -> Self {
        Self {
            last_position: Some((lat, lon)),
            last_position_time: report.position_time.clone(),
            distance_km: 0.0,
            co2_kg: 0.0,
            type_code: non_empty(report.type_code.as_deref()).map(str::to_string),
            weight_class: non_empty(report.weight_class.as_deref()).map(str::to_string),
            category: non_empty(report.category.as_deref()).map(str::to_string),
            last_seen_at: now,
        }
    }

    /// True if the report carries the same fix as the current baseline
    pub fn is_duplicate(&self, report: &PositionReport) -> bool {
        matches!(
            (&report.position_time, &self.last_position_time),
            (Some(incoming), Some(stored)) if incoming == stored
        )
    }

    /// Adopt a new baseline position without accruing anything
    pub fn rebase(&mut self, lat: f64, lon: f64, position_time: Option<PositionTime>) {
        self.last_position = Some((lat, lon));
        self.last_position_time = position_time;
    }

    /// Take any newly supplied classification values, keeping known ones
    pub fn merge_classification(&mut self, report: &PositionReport) {
        if let Some(type_code) = non_empty(report.type_code.as_deref()) {
            self.type_code = Some(type_code.to_string());
        }
        if let Some(wtc) = non_empty(report.weight_class.as_deref()) {
            self.weight_class = Some(wtc.to_string());
        }
        if let Some(category) = non_empty(report.category.as_deref()) {
            self.category = Some(category.to_string());
        }
    }

    /// Emission factor for the current classification
    pub fn emission_factor(&self) -> Option<ResolvedFactor> {
        resolve_emission_factor(
            self.type_code.as_deref(),
            self.weight_class.as_deref(),
            self.category.as_deref(),
        )
    }

    /// Accrue a movement; returns the CO₂ added, if the factor resolved
    pub fn accrue(&mut self, distance_km: f64) -> Option<f64> {
        self.distance_km += distance_km;
        let factor = self.emission_factor()?;
        let co2_kg = distance_km * factor.kg_per_km;
        self.co2_kg += co2_kg;
        Some(co2_kg)
    }

    /// Whether the track has gone unseen for longer than `max_age`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_seen_at) > max_age
    }
}
