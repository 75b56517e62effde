//! Timezone resolution
//!
//! Records are bucketed by the calendar date of their start, seen from the
//! timezone that contains their start point. The coordinate lookup is a
//! collaborator behind [`TimezoneLookup`]; the bundled implementation uses
//! the `tzf-rs` polygon dataset.

use chrono::DateTime;
use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use crate::error::ComputeError;

/// Calendar date format of the `date` partition column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Coordinate to IANA timezone lookup
pub trait TimezoneLookup: Send + Sync {
    /// Candidate zone names containing the coordinate, best first
    fn candidates(&self, lat: f64, lon: f64) -> Vec<String>;
}

/// Lookup backed by the embedded `tzf-rs` dataset
pub struct TzfLookup {
    finder: DefaultFinder,
}

impl Default for TzfLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl TzfLookup {
    /// Load the embedded dataset. This is slow; build one and share it.
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }
}

impl TimezoneLookup for TzfLookup {
    fn candidates(&self, lat: f64, lon: f64) -> Vec<String> {
        let name = self.finder.get_tz_name(lon, lat);
        if name.is_empty() {
            Vec::new()
        } else {
            vec![name.to_string()]
        }
    }
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz, ComputeError> {
    name.parse::<Tz>()
        .map_err(|e| ComputeError::InvalidTimezone(format!("{name}: {e}")))
}

/// Calendar date of an epoch-seconds instant in the given zone
pub fn local_date(epoch_seconds: i64, tz: Tz) -> Option<String> {
    DateTime::from_timestamp(epoch_seconds, 0)
        .map(|utc| utc.with_timezone(&tz).format(DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Asia/Tokyo").unwrap(), Tz::Asia__Tokyo);
        assert!(matches!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(ComputeError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        // 2021-01-01T02:00:00Z
        let ts = 1_609_466_400;
        assert_eq!(local_date(ts, Tz::UTC).as_deref(), Some("2021-01-01"));
        assert_eq!(local_date(ts, Tz::America__Los_Angeles).as_deref(), Some("2020-12-31"));
        assert_eq!(local_date(ts, Tz::Asia__Tokyo).as_deref(), Some("2021-01-01"));
    }

    #[test]
    fn test_tzf_lookup_known_cities() {
        let lookup = TzfLookup::new();
        assert_eq!(lookup.candidates(35.6812, 139.7671).first().map(String::as_str), Some("Asia/Tokyo"));
        assert_eq!(
            lookup.candidates(40.7580, -73.9855).first().map(String::as_str),
            Some("America/New_York")
        );
    }
}
