//! Human-readable rendering of totals

use chrono::{DateTime, Utc};

use crate::co2_tracker::{ReportedSummary, SummarySource};
use crate::emission_factors::ResolvedFactor;

/// `1234.5` → `"1.23 t"`, `42.0` → `"42.0 kg"`, `3.456` → `"3.46 kg"`
pub fn format_co2(kg: f64) -> String {
    if kg >= 1000.0 {
        format!("{:.2} t", kg / 1000.0)
    } else if kg >= 10.0 {
        format!("{:.1} kg", kg)
    } else {
        format!("{:.2} kg", kg)
    }
}

/// `12345.0` → `"12.3k km"`, `42.0` → `"42.0 km"`, `3.456` → `"3.46 km"`
pub fn format_distance(km: f64) -> String {
    if km >= 1000.0 {
        format!("{:.1}k km", km / 1000.0)
    } else if km >= 10.0 {
        format!("{:.1} km", km)
    } else {
        format!("{:.2} km", km)
    }
}

/// Relative age of an ISO-8601 timestamp; empty when absent or unparseable
pub fn format_age(iso: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(parsed) = iso.and_then(|s| DateTime::parse_from_rfc3339(s).ok()) else {
        return String::new();
    };

    let secs = now
        .signed_duration_since(parsed.with_timezone(&Utc))
        .num_seconds();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

/// `"10.0 kg/km (B738)"`
pub fn format_factor(factor: &ResolvedFactor) -> String {
    format!("{:.1} kg/km ({})", factor.kg_per_km, factor.source)
}

/// Source line shown under the all-time totals
pub fn format_source(summary: &ReportedSummary, now: DateTime<Utc>) -> String {
    match summary.source {
        SummarySource::Authoritative => {
            let age = format_age(summary.updated.as_deref(), now);
            if age.is_empty() {
                "Server".to_string()
            } else {
                format!("Server · updated {}", age)
            }
        }
        SummarySource::LocalFallback => "Local only".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission_factors::resolve_emission_factor;

    #[test]
    fn test_format_co2() {
        assert_eq!(format_co2(0.0), "0.00 kg");
        assert_eq!(format_co2(3.456), "3.46 kg");
        assert_eq!(format_co2(10.0), "10.0 kg");
        assert_eq!(format_co2(999.94), "999.9 kg");
        assert_eq!(format_co2(1000.0), "1.00 t");
        assert_eq!(format_co2(123_456.0), "123.46 t");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.5), "0.50 km");
        assert_eq!(format_distance(11.12), "11.1 km");
        assert_eq!(format_distance(1000.0), "1.0k km");
        assert_eq!(format_distance(98_765.0), "98.8k km");
    }

    #[test]
    fn test_format_age() {
        let now = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_age(Some("2025-06-01T11:59:48Z"), now), "12s ago");
        assert_eq!(format_age(Some("2025-06-01T11:55:00Z"), now), "5m ago");
        assert_eq!(format_age(Some("2025-06-01T09:00:00Z"), now), "3h ago");
        assert_eq!(format_age(Some("2025-05-30T12:00:00Z"), now), "2d ago");
        assert_eq!(format_age(Some("yesterday"), now), "");
        assert_eq!(format_age(None, now), "");
    }

    #[test]
    fn test_format_factor_labels() {
        let by_type = resolve_emission_factor(Some("B738"), None, None).unwrap();
        assert_eq!(format_factor(&by_type), "10.0 kg/km (B738)");

        let by_wtc = resolve_emission_factor(None, Some("H"), None).unwrap();
        assert_eq!(format_factor(&by_wtc), "22.0 kg/km (WTC-H)");

        let by_cat = resolve_emission_factor(None, None, Some("A2")).unwrap();
        assert_eq!(format_factor(&by_cat), "3.5 kg/km (cat)");
    }

    #[test]
    fn test_format_source() {
        let now = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut summary = ReportedSummary {
            all_time_distance_km: 0.0,
            all_time_co2_kg: 0.0,
            all_time_count: 0,
            source: SummarySource::Authoritative,
            updated: Some("2025-06-01T11:59:30Z".to_string()),
        };
        assert_eq!(format_source(&summary, now), "Server · updated 30s ago");

        summary.source = SummarySource::LocalFallback;
        assert_eq!(format_source(&summary, now), "Local only");
    }
}
