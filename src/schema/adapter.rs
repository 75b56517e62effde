//! Decoding of whole export documents
//!
//! Documents are parsed eagerly, entries are decoded one by one so a single
//! malformed entry can be reported and skipped without failing the file.

use crate::error::ComputeError;
use crate::schema::location::{LocationHistory, RawLocation};
use crate::schema::timeline::{TimelineDocument, TimelineEntry};

/// Adapter for semantic history documents
pub struct TimelineAdapter;

impl TimelineAdapter {
    /// Parse a semantic history document
    pub fn parse_document(json: &str) -> Result<TimelineDocument, ComputeError> {
        let document: TimelineDocument = serde_json::from_str(json)?;
        Ok(document)
    }

    /// Decode every entry of a document, keeping failures in place
    pub fn decode_entries(
        document: &TimelineDocument,
    ) -> impl Iterator<Item = Result<TimelineEntry, ComputeError>> + '_ {
        document.timeline_objects.iter().map(TimelineEntry::from_value)
    }

    /// Validate the entries of a document
    pub fn validate_entries(document: &TimelineDocument) -> Vec<ValidationResult> {
        Self::decode_entries(document)
            .enumerate()
            .filter_map(|(index, decoded)| {
                decoded.err().map(|error| ValidationResult { index, error })
            })
            .collect()
    }
}

/// Adapter for raw location records
pub struct LocationAdapter;

impl LocationAdapter {
    pub fn parse_document(json: &str) -> Result<LocationHistory, ComputeError> {
        let history: LocationHistory = serde_json::from_str(json)?;
        Ok(history)
    }

    /// Decode every fix of a document, keeping failures in place
    pub fn decode_locations(
        history: &LocationHistory,
    ) -> impl Iterator<Item = Result<RawLocation, ComputeError>> + '_ {
        history.locations.iter().map(RawLocation::from_value)
    }
}

/// A timeline entry that failed to decode
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub error: ComputeError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_malformed_indices() {
        let json = r#"{
            "timelineObjects": [
                { "placeVisit": { "location": { "latitudeE7": 1, "longitudeE7": 2 } } },
                { "unknownShape": {} },
                { "activitySegment": { "startLocation": {}, "endLocation": {} } },
                { "activitySegment": { "startLocation": {} } }
            ]
        }"#;

        let document = TimelineAdapter::parse_document(json).unwrap();
        let results = TimelineAdapter::validate_entries(&document);

        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_invalid_json_fails_the_document() {
        let result = TimelineAdapter::parse_document("not json");
        assert!(matches!(result, Err(ComputeError::JsonError(_))));
    }

    #[test]
    fn test_location_document() {
        let history = LocationAdapter::parse_document(r#"{"locations": []}"#).unwrap();
        assert!(history.locations.is_empty());
    }
}
