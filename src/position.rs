use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Source-provided timestamp of a position fix.
///
/// Opaque: only compared for equality to suppress re-delivered fixes, never
/// interpreted as wall-clock time. readsb-derived tokens are seconds; other
/// feeds may send any string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionTime {
    Seconds(f64),
    Token(String),
}

/// One position report for a single aircraft, as delivered by the live feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    /// `(lon, lat)` in degrees
    pub position: Option<(f64, f64)>,
    /// Seconds since the position was last actually updated upstream
    pub position_age_secs: Option<f64>,
    pub position_time: Option<PositionTime>,
    /// ICAO type designator (e.g. "B738")
    pub type_code: Option<String>,
    /// Wake turbulence category (L, M, H, J)
    pub weight_class: Option<String>,
    /// ADS-B emitter category (A0-D7)
    pub category: Option<String>,
}

/// Batch of reports for one cycle, keyed by aircraft hex id
pub type PositionBatch = HashMap<String, PositionReport>;

/// Returns the value only when it is present and not blank
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
