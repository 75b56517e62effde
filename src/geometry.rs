//! Geometry construction
//!
//! Builds the point, multipoint and linestring geometries attached to every
//! normalized record and renders them as Well-Known Text. Classification code
//! only deals with [`Geometry`] values; the text form lives here.

use std::collections::HashSet;
use std::fmt;

use crate::schema::PathPoint;

/// Scale factor of E7-encoded coordinates
pub const E7_SCALE: f64 = 10_000_000.0;

/// Convert an E7-encoded coordinate to decimal degrees
pub fn e7_to_degrees(value: i64) -> f64 {
    value as f64 / E7_SCALE
}

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a coordinate only when both components are known
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Self::new(lat, lon)),
            _ => None,
        }
    }

    pub fn from_e7(lat_e7: i64, lon_e7: i64) -> Self {
        Self::new(e7_to_degrees(lat_e7), e7_to_degrees(lon_e7))
    }

    /// WKT vertex text, longitude first
    fn vertex(&self) -> String {
        format!("{} {}", self.lon, self.lat)
    }
}

/// Geometry kinds emitted in the output stream
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
}

impl Geometry {
    pub fn point(coord: Coord) -> Self {
        Geometry::Point(coord)
    }

    /// Multipoint over the given path, in input order, duplicates kept.
    /// A missing path yields an empty multipoint.
    pub fn multipoint(points: Option<&[PathPoint]>) -> Self {
        let coords = points
            .unwrap_or_default()
            .iter()
            .filter_map(PathPoint::coord)
            .collect();
        Geometry::MultiPoint(coords)
    }

    /// Linestring over the given path.
    ///
    /// A vertex is dropped when its rendered text already occurred anywhere
    /// earlier in the path, not only when it repeats its predecessor.
    pub fn linestring(points: Option<&[PathPoint]>) -> Self {
        let mut seen = HashSet::new();
        let coords = points
            .unwrap_or_default()
            .iter()
            .filter_map(PathPoint::coord)
            .filter(|c| seen.insert(c.vertex()))
            .collect();
        Geometry::LineString(coords)
    }

    /// Render as Well-Known Text
    pub fn to_wkt(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(c) => write!(f, "POINT({})", c.vertex()),
            Geometry::MultiPoint(coords) if coords.is_empty() => f.write_str("MULTIPOINT EMPTY"),
            Geometry::MultiPoint(coords) => {
                let body: Vec<String> = coords.iter().map(Coord::vertex).collect();
                write!(f, "MULTIPOINT ({})", body.join(", "))
            }
            // a line needs two distinct vertices
            Geometry::LineString(coords) if coords.len() < 2 => f.write_str("LINESTRING EMPTY"),
            Geometry::LineString(coords) => {
                let body: Vec<String> = coords.iter().map(Coord::vertex).collect();
                write!(f, "LINESTRING ({})", body.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pt(lat_e7: i64, lng_e7: i64) -> PathPoint {
        PathPoint {
            lat_e7: Some(lat_e7),
            lng_e7: Some(lng_e7),
        }
    }

    #[test]
    fn test_e7_conversion() {
        assert!((e7_to_degrees(423456789) - 42.3456789).abs() < 1e-12);
        assert!((e7_to_degrees(-1223456789) + 122.3456789).abs() < 1e-12);
        assert_eq!(e7_to_degrees(0), 0.0);
    }

    #[test]
    fn test_point_is_lon_first() {
        let point = Geometry::point(Coord::from_e7(423456789, -712345678));
        assert_eq!(point.to_wkt(), "POINT(-71.2345678 42.3456789)");
    }

    #[test]
    fn test_whole_degrees_render_without_fraction() {
        let point = Geometry::point(Coord::new(0.0, 10.0));
        assert_eq!(point.to_wkt(), "POINT(10 0)");
    }

    #[test]
    fn test_multipoint_keeps_order_and_duplicates() {
        let points = vec![pt(10_000_000, 20_000_000), pt(30_000_000, 40_000_000), pt(10_000_000, 20_000_000)];
        let wkt = Geometry::multipoint(Some(points.as_slice())).to_wkt();
        assert_eq!(wkt, "MULTIPOINT (2 1, 4 3, 2 1)");
    }

    #[test]
    fn test_multipoint_empty() {
        assert_eq!(Geometry::multipoint(None).to_wkt(), "MULTIPOINT EMPTY");
        assert_eq!(Geometry::multipoint(Some(&[][..])).to_wkt(), "MULTIPOINT EMPTY");
    }

    #[test]
    fn test_linestring_drops_any_earlier_vertex() {
        // (lon, lat): (0 0), (1 1), (0 0), (2 2)
        let points = vec![pt(0, 0), pt(10_000_000, 10_000_000), pt(0, 0), pt(20_000_000, 20_000_000)];
        let wkt = Geometry::linestring(Some(points.as_slice())).to_wkt();
        assert_eq!(wkt, "LINESTRING (0 0,1 1,2 2)");
    }

    #[test]
    fn test_linestring_degenerate_paths() {
        assert_eq!(Geometry::linestring(None).to_wkt(), "LINESTRING EMPTY");
        assert_eq!(Geometry::linestring(Some(&[pt(1, 2)][..])).to_wkt(), "LINESTRING EMPTY");

        let repeated = vec![pt(5, 5), pt(5, 5), pt(5, 5)];
        assert_eq!(Geometry::linestring(Some(repeated.as_slice())).to_wkt(), "LINESTRING EMPTY");
    }

    #[test]
    fn test_path_points_missing_a_component_are_dropped() {
        let points = vec![
            pt(10_000_000, 10_000_000),
            PathPoint { lat_e7: Some(30_000_000), lng_e7: None },
            pt(20_000_000, 20_000_000),
        ];
        assert_eq!(Geometry::linestring(Some(points.as_slice())).to_wkt(), "LINESTRING (1 1,2 2)");
        assert_eq!(Geometry::multipoint(Some(points.as_slice())).to_wkt(), "MULTIPOINT (1 1, 2 2)");
    }

    #[test]
    fn test_coord_from_parts() {
        assert_eq!(Coord::from_parts(Some(1.0), Some(2.0)), Some(Coord::new(1.0, 2.0)));
        assert_eq!(Coord::from_parts(Some(1.0), None), None);
        assert_eq!(Coord::from_parts(None, Some(2.0)), None);
    }
}
