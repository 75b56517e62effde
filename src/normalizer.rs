//! Timeline entry normalization
//!
//! Maps one decoded timeline entry to one flat [`NormalizedRecord`]:
//! - E7 coordinates become decimal degrees
//! - Epoch milliseconds become epoch seconds
//! - Start, end and center coordinates become WKT points
//! - Segment paths become a WKT multipoint and a deduplicated linestring
//! - The start instant is bucketed into the local date of the start point

use std::sync::Arc;

use chrono_tz::Tz;

use crate::error::ComputeError;
use crate::geometry::{Coord, Geometry};
use crate::schema::{ActivitySegment, PlaceVisit, TimeSpan, TimelineEntry};
use crate::timezone::{local_date, parse_timezone, TimezoneLookup, TzfLookup};
use crate::types::{
    NormalizedRecord, RecordType, TravelDetails, VisitDetails, STATIONARY_MOVE_TYPE,
};

/// Convert epoch milliseconds to whole seconds, truncating toward zero
pub fn millis_to_seconds(millis: i64) -> i64 {
    millis / 1000
}

/// Normalizer for converting timeline entries to flat records
#[derive(Clone)]
pub struct Normalizer {
    default_tz: Tz,
    lookup: Arc<dyn TimezoneLookup>,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("default_tz", &self.default_tz)
            .finish_non_exhaustive()
    }
}

impl Normalizer {
    /// Create a normalizer with the bundled coordinate lookup
    pub fn new(default_timezone: &str) -> Result<Self, ComputeError> {
        Self::with_lookup(default_timezone, Arc::new(TzfLookup::new()))
    }

    /// Create a normalizer with a specific coordinate lookup
    pub fn with_lookup(
        default_timezone: &str,
        lookup: Arc<dyn TimezoneLookup>,
    ) -> Result<Self, ComputeError> {
        Ok(Self {
            default_tz: parse_timezone(default_timezone)?,
            lookup,
        })
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_tz
    }

    /// Decode a raw timeline object and normalize it
    pub fn normalize_value(
        &self,
        value: &serde_json::Value,
    ) -> Result<NormalizedRecord, ComputeError> {
        let entry = TimelineEntry::from_value(value)?;
        Ok(self.normalize(&entry))
    }

    /// Normalize a decoded timeline entry
    pub fn normalize(&self, entry: &TimelineEntry) -> NormalizedRecord {
        match entry {
            TimelineEntry::PlaceVisit(visit) => self.normalize_visit(visit),
            TimelineEntry::ActivitySegment(segment) => self.normalize_segment(segment),
        }
    }

    fn normalize_visit(&self, visit: &PlaceVisit) -> NormalizedRecord {
        let location = &visit.location;
        // a place has no separate start and end
        let position = Endpoints {
            lat_start: location.lat(),
            lon_start: location.lon(),
            lat_end: location.lat(),
            lon_end: location.lon(),
        };

        let lat_center = visit.center_lat();
        let lon_center = visit.center_lon();
        let details = VisitDetails {
            sem_type: location.semantic_type.clone(),
            place_id: location.place_id.clone(),
            address: location.address.clone(),
            name: location.name.clone(),
            confidence: location.match_confidence(),
            lat_center,
            lon_center,
            point_center: Coord::from_parts(lat_center, lon_center)
                .map(|c| Geometry::point(c).to_wkt()),
        };

        self.build(
            RecordType::Visit,
            position,
            Some(STATIONARY_MOVE_TYPE.to_string()),
            Some(0),
            &visit.duration,
            Some(details),
            None,
        )
    }

    fn normalize_segment(&self, segment: &ActivitySegment) -> NormalizedRecord {
        let position = Endpoints {
            lat_start: segment.start_location.lat(),
            lon_start: segment.start_location.lon(),
            lat_end: segment.end_location.lat(),
            lon_end: segment.end_location.lon(),
        };

        let waypoints = segment
            .waypoint_path
            .as_ref()
            .map(|p| p.waypoints.as_slice());
        let raw_points = segment
            .simplified_raw_path
            .as_ref()
            .map(|p| p.points.as_slice());
        let details = TravelDetails {
            waypoint_path: Geometry::multipoint(waypoints).to_wkt(),
            raw_path: Geometry::linestring(raw_points).to_wkt(),
        };

        self.build(
            RecordType::Travel,
            position,
            segment.activity_type.clone(),
            segment.distance,
            &segment.duration,
            None,
            Some(details),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        record_type: RecordType,
        position: Endpoints,
        move_type: Option<String>,
        distance: Option<i64>,
        span: &TimeSpan,
        visit: Option<VisitDetails>,
        travel: Option<TravelDetails>,
    ) -> NormalizedRecord {
        let start = position.start();
        let end = position.end();

        let timestamp_start = span.start_millis().map(millis_to_seconds);
        let timestamp_end = span.end_millis().map(millis_to_seconds);
        let duration = match (timestamp_start, timestamp_end) {
            (Some(s), Some(e)) => Some(e - s),
            _ => None,
        };

        let date = timestamp_start.and_then(|ts| local_date(ts, self.zone_for(start)));

        NormalizedRecord {
            record_type,
            lat_start: position.lat_start,
            lon_start: position.lon_start,
            lat_end: position.lat_end,
            lon_end: position.lon_end,
            move_type,
            distance,
            visit,
            travel,
            timestamp_start,
            timestamp_end,
            duration,
            point_start: start.map(|c| Geometry::point(c).to_wkt()),
            point_end: end.map(|c| Geometry::point(c).to_wkt()),
            date,
        }
    }

    /// Zone used to bucket a record starting at `start`.
    ///
    /// The first lookup candidate wins; unknown start points, empty lookups
    /// and names chrono-tz doesn't know fall back to the default zone.
    fn zone_for(&self, start: Option<Coord>) -> Tz {
        let Some(start) = start else {
            return self.default_tz;
        };

        let candidates = self.lookup.candidates(start.lat, start.lon);
        match candidates.first() {
            Some(name) => parse_timezone(name).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "lookup returned an unknown zone, using default");
                self.default_tz
            }),
            None => {
                tracing::debug!(lat = start.lat, lon = start.lon, "no zone for start point");
                self.default_tz
            }
        }
    }
}

/// Start and end coordinates, each component possibly unknown
struct Endpoints {
    lat_start: Option<f64>,
    lon_start: Option<f64>,
    lat_end: Option<f64>,
    lon_end: Option<f64>,
}

impl Endpoints {
    fn start(&self) -> Option<Coord> {
        Coord::from_parts(self.lat_start, self.lon_start)
    }

    fn end(&self) -> Option<Coord> {
        Coord::from_parts(self.lat_end, self.lon_end)
    }
}
