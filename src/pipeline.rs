//! Pipeline orchestration
//!
//! This module provides the public API of semantic-history. It drives whole
//! export documents through the normalizer and into a JSONL sink.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ComputeError;
use crate::normalizer::{millis_to_seconds, Normalizer};
use crate::schema::{LocationAdapter, TimelineAdapter, TimelineEntry};
use crate::sink::JsonlSink;
use crate::types::{LocationRecord, NormalizedRecord};

/// Counters for one mapping run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub files: usize,
    pub entries: usize,
    pub written: usize,
    pub skipped: usize,
    pub visits: usize,
    pub travels: usize,
}

impl BatchStats {
    fn merge(&mut self, other: BatchStats) {
        self.files += other.files;
        self.entries += other.entries;
        self.written += other.written;
        self.skipped += other.skipped;
        self.visits += other.visits;
        self.travels += other.travels;
    }
}

/// Map a semantic history document into a sink.
///
/// Malformed entries are logged and skipped; only an unparsable document or
/// a failing sink is an error.
pub fn map_to_sink<W: Write>(
    raw_json: &str,
    normalizer: &Normalizer,
    sink: &mut JsonlSink<W>,
) -> Result<BatchStats, ComputeError> {
    let document = TimelineAdapter::parse_document(raw_json)?;
    let mut stats = BatchStats {
        files: 1,
        ..Default::default()
    };

    for (index, decoded) in TimelineAdapter::decode_entries(&document).enumerate() {
        stats.entries += 1;
        let entry = match decoded {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping timeline entry");
                stats.skipped += 1;
                continue;
            }
        };

        match entry {
            TimelineEntry::PlaceVisit(_) => stats.visits += 1,
            TimelineEntry::ActivitySegment(_) => stats.travels += 1,
        }
        sink.write_record(&normalizer.normalize(&entry))?;
        tracing::trace!(index, kind = entry.kind(), "wrote timeline entry");
        stats.written += 1;
    }

    Ok(stats)
}

/// Map a semantic history document into records
pub fn map_document(
    raw_json: &str,
    normalizer: &Normalizer,
) -> Result<Vec<NormalizedRecord>, ComputeError> {
    let document = TimelineAdapter::parse_document(raw_json)?;
    let records = TimelineAdapter::decode_entries(&document)
        .filter_map(|decoded| match decoded {
            Ok(entry) => Some(normalizer.normalize(&entry)),
            Err(e) => {
                tracing::warn!(error = %e, "skipping timeline entry");
                None
            }
        })
        .collect();
    Ok(records)
}

/// Convert a semantic history document to JSONL lines.
///
/// # Arguments
/// * `raw_json` - One semantic history document
/// * `default_timezone` - IANA zone for records without a start point
///
/// # Example
/// ```ignore
/// let lines = semantic_to_jsonl(document, "America/Los_Angeles".to_string())?;
/// ```
pub fn semantic_to_jsonl(
    raw_json: String,
    default_timezone: String,
) -> Result<Vec<String>, ComputeError> {
    let normalizer = Normalizer::new(&default_timezone)?;
    map_document(&raw_json, &normalizer)?
        .iter()
        .map(|record| serde_json::to_string(record).map_err(ComputeError::JsonError))
        .collect()
}

/// Map a raw location history document into a sink.
///
/// Fixes that fail to decode or carry no timestamp are skipped.
pub fn records_to_sink<W: Write>(
    raw_json: &str,
    sink: &mut JsonlSink<W>,
) -> Result<BatchStats, ComputeError> {
    let history = LocationAdapter::parse_document(raw_json)?;
    let mut stats = BatchStats {
        files: 1,
        ..Default::default()
    };

    for (index, decoded) in LocationAdapter::decode_locations(&history).enumerate() {
        stats.entries += 1;
        let location = match decoded {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping location");
                stats.skipped += 1;
                continue;
            }
        };
        let Some(millis) = location.millis() else {
            stats.skipped += 1;
            continue;
        };

        let record = LocationRecord {
            timestamp: millis_to_seconds(millis),
            lat: location.lat(),
            lon: location.lon(),
            accuracy: location.accuracy,
        };
        sink.write_record(&record)?;
        stats.written += 1;
    }

    if stats.skipped > 0 {
        tracing::warn!(skipped = stats.skipped, "skipped unusable locations");
    }
    Ok(stats)
}

/// Expand input paths into the list of documents to read.
///
/// Directories are searched recursively for `*.json` files, sorted by path;
/// plain paths are kept as given.
pub fn discover_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ComputeError> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            collect_json_files(path, &mut found)?;
            found.sort();
            inputs.extend(found);
        } else {
            inputs.push(path.clone());
        }
    }
    Ok(inputs)
}

fn collect_json_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), ComputeError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, found)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            found.push(path);
        }
    }
    Ok(())
}

/// Stateful processor mapping many documents into one output.
pub struct SemanticProcessor {
    normalizer: Normalizer,
    stats: BatchStats,
}

impl SemanticProcessor {
    /// Create a processor with the bundled coordinate lookup
    pub fn new(default_timezone: &str) -> Result<Self, ComputeError> {
        Ok(Self::with_normalizer(Normalizer::new(default_timezone)?))
    }

    pub fn with_normalizer(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            stats: BatchStats::default(),
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Totals over everything processed so far
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Process one in-memory document
    pub fn process_str<W: Write>(
        &mut self,
        raw_json: &str,
        sink: &mut JsonlSink<W>,
    ) -> Result<BatchStats, ComputeError> {
        let stats = map_to_sink(raw_json, &self.normalizer, sink)?;
        self.stats.merge(stats);
        Ok(stats)
    }

    /// Process one document from disk
    pub fn process_file<W: Write>(
        &mut self,
        path: &Path,
        sink: &mut JsonlSink<W>,
    ) -> Result<BatchStats, ComputeError> {
        let raw_json = fs::read_to_string(path).map_err(|e| {
            ComputeError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        let stats = self.process_str(&raw_json, sink).map_err(|e| match e {
            ComputeError::JsonError(e) => {
                ComputeError::ParseError(format!("{}: {}", path.display(), e))
            }
            other => other,
        })?;
        tracing::debug!(
            path = %path.display(),
            written = stats.written,
            skipped = stats.skipped,
            "mapped document"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::tests::FixedLookup;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn test_normalizer() -> Normalizer {
        Normalizer::with_lookup("UTC", Arc::new(FixedLookup::new(&["Europe/Paris"]))).unwrap()
    }

    fn sample_document() -> &'static str {
        r#"{
            "timelineObjects": [
                {
                    "activitySegment": {
                        "startLocation": { "latitudeE7": 488566000, "longitudeE7": 23522000 },
                        "endLocation": { "latitudeE7": 488606000, "longitudeE7": 23376000 },
                        "duration": { "startTimestampMs": "1609455600000", "endTimestampMs": "1609456500000" },
                        "distance": 1200,
                        "activityType": "WALKING",
                        "simplifiedRawPath": { "points": [
                            { "latE7": 488566000, "lngE7": 23522000 },
                            { "latE7": 488606000, "lngE7": 23376000 }
                        ] }
                    }
                },
                { "somethingElse": { "foo": 1 } },
                {
                    "placeVisit": {
                        "location": { "latitudeE7": 488606000, "longitudeE7": 23376000, "name": "Louvre" },
                        "duration": { "startTimestampMs": "1609456500000", "endTimestampMs": "1609466500000" }
                    }
                }
            ]
        }"#
    }

    #[test]
    fn test_map_to_sink_skips_malformed() {
        let normalizer = test_normalizer();
        let mut sink = JsonlSink::new(Vec::new());
        let stats = map_to_sink(sample_document(), &normalizer, &mut sink).unwrap();

        assert_eq!(
            stats,
            BatchStats {
                files: 1,
                entries: 3,
                written: 2,
                skipped: 1,
                visits: 1,
                travels: 1,
            }
        );

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "TRAVEL");
        assert_eq!(lines[0]["rawPath"], "LINESTRING (2.3522 48.8566,2.3376 48.8606)");
        assert_eq!(lines[1]["type"], "VISIT");
        assert_eq!(lines[1]["name"], "Louvre");
        // 2020-12-31T23:00:00Z is already New Year's Day in Paris
        assert_eq!(lines[0]["date"], "2021-01-01");
    }

    #[test]
    fn test_map_document() {
        let records = map_document(sample_document(), &test_normalizer()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_invalid_document_fails() {
        let mut sink = JsonlSink::new(Vec::new());
        let result = map_to_sink("{ not json", &test_normalizer(), &mut sink);
        assert!(result.is_err());
        assert_eq!(sink.written(), 0);
    }

    #[test]
    fn test_processor_accumulates_stats() {
        let mut processor = SemanticProcessor::with_normalizer(test_normalizer());
        let mut sink = JsonlSink::new(Vec::new());
        processor.process_str(sample_document(), &mut sink).unwrap();
        processor.process_str(sample_document(), &mut sink).unwrap();

        assert_eq!(processor.normalizer().default_timezone(), chrono_tz::UTC);

        let stats = processor.stats();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.written, 4);
        assert_eq!(stats.skipped, 2);
        assert_eq!(sink.finish().unwrap(), 4);
    }

    #[test]
    fn test_records_to_sink() {
        let json = r#"{
            "locations": [
                { "timestampMs": "1609459200999", "latitudeE7": 423456789, "longitudeE7": -712345678, "accuracy": 20 },
                { "latitudeE7": 1, "longitudeE7": 2 },
                { "timestamp": "2021-01-01T00:00:05Z", "latitudeE7": 0, "longitudeE7": 0 },
                { "timestampMs": "yesterday", "latitudeE7": 5, "longitudeE7": 6 },
                { "timestamp": "01/01/2021", "latitudeE7": 7, "longitudeE7": 8 }
            ]
        }"#;

        let mut sink = JsonlSink::new(Vec::new());
        let stats = records_to_sink(json, &mut sink).unwrap();
        assert_eq!(stats.entries, 5);
        assert_eq!(stats.written, 2);
        assert_eq!(stats.skipped, 3);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["timestamp"], 1_609_459_200);
        assert_eq!(lines[0]["lat"], 42.3456789);
        assert_eq!(lines[0]["accuracy"], 20);
        assert_eq!(lines[1]["timestamp"], 1_609_459_205);
        assert!(lines[1].get("accuracy").is_none());
    }

    #[test]
    fn test_discover_inputs_sorted_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2021");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("2021_JANUARY.json"), "{}").unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.JSON"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let explicit = PathBuf::from("explicit.json");
        let inputs = discover_inputs(&[dir.path().to_path_buf(), explicit.clone()]).unwrap();

        assert_eq!(
            inputs,
            vec![
                nested.join("2021_JANUARY.json"),
                dir.path().join("a.JSON"),
                dir.path().join("b.json"),
                explicit,
            ]
        );
    }
}
