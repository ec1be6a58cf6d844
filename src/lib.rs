//! co2track - distance and CO₂ estimates for aircraft seen by an ADS-B receiver
//!
//! Position reports from a readsb/tar1090 feed are accumulated per aircraft
//! into distance flown and CO₂ emitted, using per-type emission factors.
//! All-time totals come from the collector daemon when reachable, otherwise
//! from locally persisted totals plus this session.

pub mod authoritative;
pub mod co2_tracker;
pub mod emission_factors;
pub mod fallback_store;
pub mod format;
pub mod geometry;
pub mod log_format;
pub mod metrics;
pub mod position;
pub mod position_sources;
pub mod runner;
pub mod status_server;
pub mod tracker_config;

pub use co2_tracker::{Co2Tracker, ReportedSummary, SummarySource, Thresholds};
pub use emission_factors::{FactorSource, ResolvedFactor, resolve_emission_factor};
pub use position::{PositionBatch, PositionReport, PositionTime};
