//! semantic-history - Flatten location-history timelines into JSONL records
//!
//! A semantic location history export describes place visits and activity
//! segments as nested JSON. This crate maps every timeline entry through a
//! deterministic pipeline: decoding → classification → coordinate and time
//! conversion → WKT geometry construction → local date bucketing → JSONL.
//!
//! ## Modules
//!
//! - **Semantic timeline**: visits and segments into `NormalizedRecord` lines
//! - **Raw records**: device fixes into `{timestamp, lat, lon, accuracy}` lines

pub mod error;
pub mod geometry;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod timezone;
pub mod types;

pub use error::ComputeError;
pub use normalizer::Normalizer;
pub use pipeline::{map_document, map_to_sink, semantic_to_jsonl, BatchStats, SemanticProcessor};
pub use sink::JsonlSink;
pub use types::{NormalizedRecord, RecordType};

// Schema exports
pub use schema::{TimelineAdapter, TimelineEntry};

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "semantic-history";
