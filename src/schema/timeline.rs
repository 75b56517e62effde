//! Semantic location history input schema
//!
//! A semantic history export is one JSON document per month holding a
//! `timelineObjects` list. Every object is either a place visit or an
//! activity segment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::ComputeError;
use crate::geometry::{e7_to_degrees, Coord};

/// One month of semantic location history
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineDocument {
    /// Raw timeline objects, decoded one at a time so a bad entry
    /// doesn't take the document down with it
    #[serde(rename = "timelineObjects", default)]
    pub timeline_objects: Vec<serde_json::Value>,
}

/// A decoded timeline entry
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEntry {
    PlaceVisit(PlaceVisit),
    ActivitySegment(ActivitySegment),
}

impl TimelineEntry {
    /// Decode a raw timeline object.
    ///
    /// Fails when the object carries neither shape, both shapes, or a
    /// shape whose required parts are missing.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ComputeError> {
        let shape = EntryShape::deserialize(value)
            .map_err(|e| ComputeError::MalformedEntry(e.to_string()))?;
        Self::try_from(shape)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TimelineEntry::PlaceVisit(_) => "placeVisit",
            TimelineEntry::ActivitySegment(_) => "activitySegment",
        }
    }
}

/// Wire shape of a timeline object; both members are checked here and
/// nowhere else
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryShape {
    place_visit: Option<PlaceVisit>,
    activity_segment: Option<ActivitySegment>,
}

impl TryFrom<EntryShape> for TimelineEntry {
    type Error = ComputeError;

    fn try_from(shape: EntryShape) -> Result<Self, Self::Error> {
        match (shape.place_visit, shape.activity_segment) {
            (Some(visit), None) => Ok(TimelineEntry::PlaceVisit(visit)),
            (None, Some(segment)) => Ok(TimelineEntry::ActivitySegment(segment)),
            (Some(_), Some(_)) => Err(ComputeError::MalformedEntry(
                "entry carries both placeVisit and activitySegment".to_string(),
            )),
            (None, None) => Err(ComputeError::MalformedEntry(
                "entry carries neither placeVisit nor activitySegment".to_string(),
            )),
        }
    }
}

/// A stay at a single place
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceVisit {
    pub location: PlaceLocation,
    #[serde(default)]
    pub duration: TimeSpan,
    pub center_lat_e7: Option<i64>,
    pub center_lng_e7: Option<i64>,
}

impl PlaceVisit {
    pub fn center_lat(&self) -> Option<f64> {
        self.center_lat_e7.map(e7_to_degrees)
    }

    pub fn center_lon(&self) -> Option<f64> {
        self.center_lng_e7.map(e7_to_degrees)
    }
}

/// Place descriptor attached to a visit
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceLocation {
    pub latitude_e7: Option<i64>,
    pub longitude_e7: Option<i64>,
    pub semantic_type: Option<String>,
    pub place_id: Option<String>,
    pub address: Option<String>,
    pub name: Option<String>,
    pub confidence: Option<f64>,
    pub location_confidence: Option<f64>,
}

impl PlaceLocation {
    pub fn lat(&self) -> Option<f64> {
        self.latitude_e7.map(e7_to_degrees)
    }

    pub fn lon(&self) -> Option<f64> {
        self.longitude_e7.map(e7_to_degrees)
    }

    /// Match confidence, `confidence` taking precedence over the older
    /// `locationConfidence` key
    pub fn match_confidence(&self) -> Option<f64> {
        self.confidence.or(self.location_confidence)
    }
}

/// Movement between two places
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySegment {
    pub start_location: SegmentLocation,
    pub end_location: SegmentLocation,
    pub activity_type: Option<String>,
    #[serde(default, deserialize_with = "meters")]
    pub distance: Option<i64>,
    #[serde(default)]
    pub duration: TimeSpan,
    pub waypoint_path: Option<WaypointPath>,
    pub simplified_raw_path: Option<SimplifiedRawPath>,
}

/// Start or end of a segment
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentLocation {
    pub latitude_e7: Option<i64>,
    pub longitude_e7: Option<i64>,
}

impl SegmentLocation {
    pub fn lat(&self) -> Option<f64> {
        self.latitude_e7.map(e7_to_degrees)
    }

    pub fn lon(&self) -> Option<f64> {
        self.longitude_e7.map(e7_to_degrees)
    }
}

/// Coarse waypoints inferred for a segment
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WaypointPath {
    #[serde(default)]
    pub waypoints: Vec<PathPoint>,
}

/// Simplified recorded path of a segment, may repeat points
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimplifiedRawPath {
    #[serde(default)]
    pub points: Vec<PathPoint>,
}

/// A single path vertex
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPoint {
    pub lat_e7: Option<i64>,
    pub lng_e7: Option<i64>,
}

impl PathPoint {
    pub fn coord(&self) -> Option<Coord> {
        match (self.lat_e7, self.lng_e7) {
            (Some(lat), Some(lng)) => Some(Coord::from_e7(lat, lng)),
            _ => None,
        }
    }
}

/// Start and end of a visit or segment.
///
/// Older exports carry epoch milliseconds (as strings), newer ones carry
/// RFC 3339 timestamps. Milliseconds win when both are present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSpan {
    #[serde(default, deserialize_with = "epoch_millis")]
    pub start_timestamp_ms: Option<i64>,
    #[serde(default, deserialize_with = "epoch_millis")]
    pub end_timestamp_ms: Option<i64>,
    pub start_timestamp: Option<DateTime<Utc>>,
    pub end_timestamp: Option<DateTime<Utc>>,
}

impl TimeSpan {
    pub fn start_millis(&self) -> Option<i64> {
        self.start_timestamp_ms
            .or_else(|| self.start_timestamp.map(|t| t.timestamp_millis()))
    }

    pub fn end_millis(&self) -> Option<i64> {
        self.end_timestamp_ms
            .or_else(|| self.end_timestamp.map(|t| t.timestamp_millis()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Epoch milliseconds given either as a JSON number or a decimal string
pub(crate) fn epoch_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Int(v)) => Ok(Some(v)),
        Some(NumberOrString::Float(v)) => Ok(Some(v.trunc() as i64)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid epoch millis {s:?}: {e}"))),
    }
}

/// Whole meters, rounding fractional distances
fn meters<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Int(v)) => Ok(Some(v)),
        Some(NumberOrString::Float(v)) => Ok(Some(v.round() as i64)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(|v| Some(v.round() as i64))
            .map_err(|e| serde::de::Error::custom(format!("invalid distance {s:?}: {e}"))),
    }
}
