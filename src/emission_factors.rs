//! Emission factors in kg CO₂ per km flown (whole aircraft, combustion only)
//!
//! Factors are fuel burn per km multiplied by 3.16, the IPCC kerosene CO₂
//! factor. Fuel burn figures come from published type performance summaries;
//! business-jet values are manufacturer cruise fuel flow divided by cruise
//! speed. Values for rarer types are interpolated from similar airframes.
//!
//! When the ICAO type designator is unknown, the wake turbulence category and
//! then the ADS-B emitter category give a coarse fallback.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

static TYPE_FACTORS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        // Turboprops
        ("AT43", 4.1),
        ("AT45", 4.0),
        ("AT72", 4.9),
        ("AT76", 4.7),
        ("DH8A", 4.4),
        ("DH8B", 4.7),
        ("DH8C", 5.4),
        ("DH8D", 6.5),
        ("SF34", 3.2),
        ("D328", 3.6),
        ("F50", 4.7),
        ("JS41", 3.2),
        ("L410", 2.1),
        ("AN26", 7.9),
        ("AN24", 7.0),
        ("BEH2", 3.2),
        // Regional jets
        ("CRJ1", 5.9),
        ("CRJ2", 5.7),
        ("CRJ7", 7.7),
        ("CRJ9", 8.8),
        ("CRJX", 8.4),
        ("E135", 4.6),
        ("E145", 4.9),
        ("E170", 8.2),
        ("E75L", 8.8),
        ("E75S", 8.8),
        ("E190", 10.2),
        ("E195", 10.1),
        ("E290", 7.8),
        ("E295", 8.3),
        ("F70", 7.3),
        ("F100", 8.8),
        ("RJ85", 9.5),
        ("RJ1H", 10.1),
        ("SU95", 8.9),
        ("AR85", 8.8),
        // Narrow-body
        ("A318", 8.5),
        ("A319", 9.3),
        ("A19N", 7.6),
        ("A320", 9.5),
        ("A20N", 8.8),
        ("A321", 11.4),
        ("A21N", 10.7),
        ("B731", 9.5),
        ("B732", 10.1),
        ("B733", 10.1),
        ("B734", 10.4),
        ("B735", 9.5),
        ("B736", 8.8),
        ("B737", 8.9),
        ("B738", 10.0),
        ("B739", 10.8),
        ("B37M", 7.9),
        ("B38M", 8.6),
        ("B39M", 9.2),
        ("B752", 13.9),
        ("B753", 14.8),
        ("MD80", 11.1),
        ("MD81", 10.7),
        ("MD82", 11.1),
        ("MD83", 11.1),
        ("MD87", 10.1),
        ("MD88", 11.1),
        ("MD90", 10.4),
        ("BCS1", 7.2),
        ("BCS3", 7.7),
        ("C919", 9.8),
        ("B712", 8.8),
        ("DC93", 8.8),
        ("DC95", 9.5),
        ("T204", 10.4),
        ("T154", 17.4),
        // Wide-body
        ("A306", 20.5),
        ("A30B", 22.1),
        ("A310", 17.4),
        ("A332", 19.6),
        ("A333", 20.6),
        ("A338", 17.2),
        ("A339", 18.9),
        ("A342", 22.1),
        ("A343", 22.3),
        ("A345", 25.3),
        ("A346", 26.9),
        ("A359", 20.7),
        ("A35K", 23.8),
        ("A388", 43.5),
        ("B741", 37.9),
        ("B742", 37.9),
        ("B743", 37.9),
        ("B744", 36.5),
        ("B748", 33.0),
        ("B762", 15.5),
        ("B763", 17.2),
        ("B764", 18.5),
        ("B772", 21.6),
        ("B77L", 23.9),
        ("B77W", 27.4),
        ("B788", 16.8),
        ("B789", 18.1),
        ("B78X", 19.5),
        ("DC10", 26.9),
        ("MD11", 26.9),
        ("L101", 26.9),
        ("IL96", 28.4),
        ("IL86", 31.6),
        // Business and private
        ("C25A", 1.2),
        ("C25B", 1.3),
        ("C25C", 1.5),
        ("C25M", 1.6),
        ("C510", 1.0),
        ("C525", 1.2),
        ("C500", 1.1),
        ("C550", 1.4),
        ("C560", 1.8),
        ("C56X", 2.0),
        ("C680", 2.4),
        ("C68A", 2.4),
        ("C700", 2.6),
        ("C750", 3.5),
        ("CL30", 2.9),
        ("CL35", 2.9),
        ("CL60", 3.2),
        ("GL5T", 5.1),
        ("GL7T", 5.5),
        ("GLEX", 5.3),
        ("GLF4", 3.5),
        ("GLF5", 5.9),
        ("GLF6", 5.4),
        ("G150", 1.8),
        ("G280", 2.4),
        ("FA50", 2.2),
        ("FA7X", 3.4),
        ("FA8X", 3.5),
        ("F900", 2.7),
        ("F2TH", 2.4),
        ("E35L", 1.6),
        ("E55P", 1.6),
        ("LJ35", 2.0),
        ("LJ45", 2.1),
        ("LJ60", 2.4),
        ("LJ75", 2.3),
        ("H25B", 2.5),
        ("H25C", 3.0),
        ("GALX", 2.6),
        ("ASTR", 1.8),
        ("PC12", 1.4),
        ("PC24", 1.6),
        ("TBM7", 1.1),
        ("TBM8", 1.1),
        ("TBM9", 1.1),
        ("PRM1", 1.5),
        ("P180", 1.4),
        ("BE20", 1.4),
        ("BE30", 1.9),
        ("BE40", 1.6),
        ("BE4W", 1.7),
        ("EA50", 1.0),
        // Military transport and tankers
        ("C130", 14.2),
        ("C30J", 12.6),
        ("C17", 31.6),
        ("C5", 45.8),
        ("C5M", 45.8),
        ("K35R", 26.9),
        ("KC10", 26.9),
        ("A400", 15.2),
        ("MRTT", 20.5),
        ("A124", 56.9),
        ("AN12", 14.2),
        ("IL76", 23.7),
        ("E3CF", 26.9),
        ("E6", 26.9),
        ("P3", 11.1),
        ("P8", 11.1),
    ])
});

/// Wake turbulence category fallback (L, M, H, J)
static WTC_FACTORS: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| HashMap::from([("L", 1.5), ("M", 8.0), ("H", 22.0), ("J", 43.5)]));

/// ADS-B emitter category fallback
static CATEGORY_FACTORS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("A1", 1.2),
        ("A2", 3.5),
        ("A3", 9.0),
        ("A4", 13.9),
        ("A5", 22.0),
        ("A6", 22.0),
        ("A7", 0.5),
        ("B1", 0.0),
        ("B2", 0.1),
        ("B4", 0.0),
        ("B6", 0.1),
        ("C1", 0.0),
        ("C3", 0.0),
    ])
});

/// Which table a factor came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", content = "key", rename_all = "snake_case")]
pub enum FactorSource {
    TypeCode(String),
    WeightClass(String),
    Category(String),
}

impl fmt::Display for FactorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorSource::TypeCode(code) => write!(f, "{}", code),
            FactorSource::WeightClass(wtc) => write!(f, "WTC-{}", wtc),
            FactorSource::Category(_) => write!(f, "cat"),
        }
    }
}

/// A resolved emission factor and the tier that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFactor {
    pub kg_per_km: f64,
    pub source: FactorSource,
}

/// Resolve the emission factor for an aircraft classification.
///
/// Strict precedence: type code, then wake turbulence category, then emitter
/// category. Returns `None` when nothing matches, which just means the
/// aircraft metadata is incomplete.
pub fn resolve_emission_factor(
    type_code: Option<&str>,
    weight_class: Option<&str>,
    category: Option<&str>,
) -> Option<ResolvedFactor> {
    if let Some(code) = type_code
        && let Some(&kg_per_km) = TYPE_FACTORS.get(code)
    {
        return Some(ResolvedFactor {
            kg_per_km,
            source: FactorSource::TypeCode(code.to_string()),
        });
    }

    if let Some(wtc) = weight_class
        && let Some(&kg_per_km) = WTC_FACTORS.get(wtc)
    {
        return Some(ResolvedFactor {
            kg_per_km,
            source: FactorSource::WeightClass(wtc.to_string()),
        });
    }

    if let Some(cat) = category
        && let Some(&kg_per_km) = CATEGORY_FACTORS.get(cat)
    {
        return Some(ResolvedFactor {
            kg_per_km,
            source: FactorSource::Category(cat.to_string()),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_wins_over_fallbacks() {
        // B738 is 10.0 while WTC-H would give 22.0 and A5 22.0
        let factor = resolve_emission_factor(Some("B738"), Some("H"), Some("A5")).unwrap();
        assert_eq!(factor.kg_per_km, 10.0);
        assert_eq!(factor.source, FactorSource::TypeCode("B738".to_string()));
    }

    #[test]
    fn test_unknown_type_falls_back_to_weight_class() {
        let factor = resolve_emission_factor(Some("ZZZZ"), Some("M"), Some("A1")).unwrap();
        assert_eq!(factor.kg_per_km, 8.0);
        assert_eq!(factor.source.to_string(), "WTC-M");
    }

    #[test]
    fn test_category_is_last_resort() {
        let factor = resolve_emission_factor(None, Some("X"), Some("A3")).unwrap();
        assert_eq!(factor.kg_per_km, 9.0);
        assert_eq!(factor.source.to_string(), "cat");
    }

    #[test]
    fn test_zero_factor_category_still_resolves() {
        // Gliders (B1) resolve to zero emission rather than unresolved
        let factor = resolve_emission_factor(None, None, Some("B1")).unwrap();
        assert_eq!(factor.kg_per_km, 0.0);
    }

    #[test]
    fn test_unresolved_when_nothing_matches() {
        assert!(resolve_emission_factor(None, None, None).is_none());
        assert!(resolve_emission_factor(Some("b738"), Some("m"), Some("a3")).is_none());
        assert!(resolve_emission_factor(Some("B73"), None, Some("D9")).is_none());
    }

    #[test]
    fn test_type_table_lookup() {
        let kg_per_km = |code| resolve_emission_factor(Some(code), None, None).map(|f| f.kg_per_km);
        assert_eq!(kg_per_km("A388"), Some(43.5));
        assert_eq!(kg_per_km("A320"), Some(9.5));
        assert_eq!(kg_per_km("XXXX"), None);
    }

    #[test]
    fn test_all_factors_non_negative() {
        assert!(TYPE_FACTORS.values().all(|f| *f >= 0.0));
        assert!(WTC_FACTORS.values().all(|f| *f >= 0.0));
        assert!(CATEGORY_FACTORS.values().all(|f| *f >= 0.0));
    }
}
