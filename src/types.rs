//! Output record types
//!
//! Field names are the column names of the target table and must not change.

use serde::Serialize;

/// Classification of a normalized record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    Visit,
    Travel,
}

/// Movement tag used for visits
pub const STATIONARY_MOVE_TYPE: &str = "NONE";

/// One flattened timeline entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub lat_start: Option<f64>,
    pub lon_start: Option<f64>,
    pub lat_end: Option<f64>,
    pub lon_end: Option<f64>,
    pub move_type: Option<String>,
    /// Meters
    pub distance: Option<i64>,

    #[serde(flatten)]
    pub visit: Option<VisitDetails>,
    #[serde(flatten)]
    pub travel: Option<TravelDetails>,

    /// Epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_start: Option<i64>,
    /// Epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_end: Option<i64>,
    /// Seconds between start and end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    /// WKT point of the start coordinate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_start: Option<String>,
    /// WKT point of the end coordinate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_end: Option<String>,

    /// Local calendar date of the start, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Columns only populated for visits
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sem_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat_center: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon_center: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_center: Option<String>,
}

/// Columns only populated for travel segments
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelDetails {
    /// WKT multipoint of the coarse waypoints
    pub waypoint_path: String,
    /// WKT linestring of the deduplicated raw path
    pub raw_path: String,
}

/// One raw device fix, flattened
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRecord {
    /// Epoch seconds
    pub timestamp: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<i64>,
}

/// Column description of the output table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub column_type: &'static str,
    pub mode: &'static str,
    pub description: &'static str,
}

/// Day-partition column of the output table
pub const PARTITION_COLUMN: &str = "date";

/// Ordered column list of the normalized record table
pub fn table_schema() -> Vec<ColumnSpec> {
    const COLUMNS: &[(&str, &str, &str, &str)] = &[
        ("type", "STRING", "REQUIRED", "VISIT or TRAVEL"),
        ("latStart", "FLOAT", "NULLABLE", "Start latitude, decimal degrees"),
        ("lonStart", "FLOAT", "NULLABLE", "Start longitude, decimal degrees"),
        ("latEnd", "FLOAT", "NULLABLE", "End latitude, decimal degrees"),
        ("lonEnd", "FLOAT", "NULLABLE", "End longitude, decimal degrees"),
        ("moveType", "STRING", "NULLABLE", "Activity type, NONE for visits"),
        ("distance", "INTEGER", "NULLABLE", "Meters travelled, 0 for visits"),
        ("semType", "STRING", "NULLABLE", "Semantic place type"),
        ("placeId", "STRING", "NULLABLE", "Place identifier"),
        ("address", "STRING", "NULLABLE", "Place address"),
        ("name", "STRING", "NULLABLE", "Place display name"),
        ("confidence", "FLOAT", "NULLABLE", "Place match confidence"),
        ("latCenter", "FLOAT", "NULLABLE", "Visit center latitude"),
        ("lonCenter", "FLOAT", "NULLABLE", "Visit center longitude"),
        ("pointCenter", "GEOGRAPHY", "NULLABLE", "Visit center point"),
        ("waypointPath", "GEOGRAPHY", "NULLABLE", "Travel waypoints"),
        ("rawPath", "GEOGRAPHY", "NULLABLE", "Travel path"),
        ("timestampStart", "INTEGER", "NULLABLE", "Start, epoch seconds"),
        ("timestampEnd", "INTEGER", "NULLABLE", "End, epoch seconds"),
        ("duration", "INTEGER", "NULLABLE", "Seconds between start and end"),
        ("pointStart", "GEOGRAPHY", "NULLABLE", "Start point"),
        ("pointEnd", "GEOGRAPHY", "NULLABLE", "End point"),
        ("date", "DATE", "NULLABLE", "Local date of the start, partition column"),
    ];

    COLUMNS
        .iter()
        .map(|&(name, column_type, mode, description)| ColumnSpec {
            name,
            column_type,
            mode,
            description,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_travel() -> NormalizedRecord {
        NormalizedRecord {
            record_type: RecordType::Travel,
            lat_start: Some(1.0),
            lon_start: Some(2.0),
            lat_end: None,
            lon_end: None,
            move_type: Some("WALKING".to_string()),
            distance: Some(120),
            visit: None,
            travel: Some(TravelDetails {
                waypoint_path: "MULTIPOINT EMPTY".to_string(),
                raw_path: "LINESTRING EMPTY".to_string(),
            }),
            timestamp_start: Some(10),
            timestamp_end: None,
            duration: None,
            point_start: Some("POINT(2 1)".to_string()),
            point_end: None,
            date: Some("1970-01-01".to_string()),
        }
    }

    #[test]
    fn test_record_serializes_flat() {
        let value = serde_json::to_value(sample_travel()).unwrap();

        assert_eq!(value["type"], "TRAVEL");
        assert_eq!(value["waypointPath"], "MULTIPOINT EMPTY");
        assert_eq!(value["rawPath"], "LINESTRING EMPTY");
        assert!(value["latEnd"].is_null());
        assert!(value.get("latEnd").is_some());
        assert!(value.get("timestampEnd").is_none());
        assert!(value.get("pointEnd").is_none());
        assert!(value.get("semType").is_none());
        assert!(value.get("visit").is_none());
    }

    #[test]
    fn test_every_record_field_is_a_table_column() {
        let columns: Vec<&str> = table_schema().iter().map(|c| c.name).collect();
        let mut record = sample_travel();
        record.visit = Some(VisitDetails {
            sem_type: Some("HOME".to_string()),
            place_id: Some("p".to_string()),
            address: Some("a".to_string()),
            name: Some("n".to_string()),
            confidence: Some(1.0),
            lat_center: Some(1.0),
            lon_center: Some(1.0),
            point_center: Some("POINT(1 1)".to_string()),
        });
        record.timestamp_end = Some(20);
        record.duration = Some(10);
        record.point_end = Some("POINT(0 0)".to_string());

        let value = serde_json::to_value(record).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), columns.len());
        for key in object.keys() {
            assert!(columns.contains(&key.as_str()), "{key} is not a table column");
        }
        assert!(columns.contains(&PARTITION_COLUMN));
    }
}
