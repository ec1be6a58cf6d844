use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Distance, CO₂ and distinct-aircraft totals
///
/// Used for both the in-memory session aggregate and the persisted aggregate
/// carried over from earlier process lifetimes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub distance_km: f64,
    pub co2_kg: f64,
    pub count: u64,
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals {
            distance_km: self.distance_km + rhs.distance_km,
            co2_kg: self.co2_kg + rhs.co2_kg,
            count: self.count + rhs.count,
        }
    }
}

/// Totals accumulated during this process lifetime
pub type SessionAggregate = Totals;

/// Totals accumulated before this process lifetime
pub type PersistedAggregate = Totals;

/// All-time totals published by the always-on collector daemon (`co2data.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoritativeAggregate {
    pub co2_kg: f64,
    pub dist_km: f64,
    pub count: u64,
    /// Collection start, as published (ISO-8601)
    #[serde(default)]
    pub since: Option<String>,
    /// Last update, as published (ISO-8601)
    #[serde(default)]
    pub updated: Option<String>,
}

/// Latest known authoritative aggregate plus its availability
///
/// `available` is true only right after a successful, parseable fetch. A
/// failed fetch clears it but keeps the last value around for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthoritativeSnapshot {
    pub value: Option<AuthoritativeAggregate>,
    pub available: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl AuthoritativeSnapshot {
    /// The authoritative aggregate, if it may be reported right now
    pub fn current(&self) -> Option<&AuthoritativeAggregate> {
        if self.available {
            self.value.as_ref()
        } else {
            None
        }
    }

    /// Record a successful fetch
    pub fn record_success(&mut self, value: AuthoritativeAggregate, now: DateTime<Utc>) {
        self.value = Some(value);
        self.available = true;
        self.last_success_at = Some(now);
        self.consecutive_failures = 0;
    }

    /// Record a failed fetch (transport, status, timeout or parse error)
    pub fn record_failure(&mut self) {
        self.available = false;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

/// Where the reported all-time totals came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// The collector daemon's totals, reported verbatim
    Authoritative,
    /// Persisted + session totals; degraded confidence
    LocalFallback,
}

impl std::fmt::Display for SummarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummarySource::Authoritative => write!(f, "authoritative"),
            SummarySource::LocalFallback => write!(f, "local_fallback"),
        }
    }
}

/// Reported all-time totals, recomputed on demand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedSummary {
    pub all_time_distance_km: f64,
    pub all_time_co2_kg: f64,
    pub all_time_count: u64,
    pub source: SummarySource,
    /// Authoritative last-update time, for staleness display
    pub updated: Option<String>,
}

/// Reconcile the three sources into one reported summary.
///
/// The authoritative aggregate wins whenever it is available; otherwise the
/// persisted and session totals are summed field by field.
pub fn reconcile(
    session: &SessionAggregate,
    persisted: &PersistedAggregate,
    authoritative: &AuthoritativeSnapshot,
) -> ReportedSummary {
    match authoritative.current() {
        Some(auth) => ReportedSummary {
            all_time_distance_km: auth.dist_km,
            all_time_co2_kg: auth.co2_kg,
            all_time_count: auth.count,
            source: SummarySource::Authoritative,
            updated: auth.updated.clone(),
        },
        None => {
            let combined = *persisted + *session;
            ReportedSummary {
                all_time_distance_km: combined.distance_km,
                all_time_co2_kg: combined.co2_kg,
                all_time_count: combined.count,
                source: SummarySource::LocalFallback,
                updated: None,
            }
        }
    }
}
