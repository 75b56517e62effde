//! Raw location records input schema
//!
//! The raw history export (`Records.json`) is a single `locations` list of
//! device fixes, without any semantic grouping.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::timeline::epoch_millis;
use crate::error::ComputeError;
use crate::geometry::e7_to_degrees;

/// Raw location history document
#[derive(Debug, Clone, Deserialize)]
pub struct LocationHistory {
    /// Raw fixes, decoded one at a time
    #[serde(default)]
    pub locations: Vec<serde_json::Value>,
}

/// A single device fix
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub latitude_e7: Option<i64>,
    pub longitude_e7: Option<i64>,
    pub accuracy: Option<i64>,
    #[serde(default, deserialize_with = "epoch_millis")]
    pub timestamp_ms: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawLocation {
    /// Decode a single raw fix
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ComputeError> {
        Self::deserialize(value).map_err(|e| ComputeError::MalformedEntry(e.to_string()))
    }

    pub fn lat(&self) -> Option<f64> {
        self.latitude_e7.map(e7_to_degrees)
    }

    pub fn lon(&self) -> Option<f64> {
        self.longitude_e7.map(e7_to_degrees)
    }

    pub fn millis(&self) -> Option<i64> {
        self.timestamp_ms
            .or_else(|| self.timestamp.map(|t| t.timestamp_millis()))
    }
}
