//! Spatial query utilities for distance calculations.
//!
//! Uses the haversine formula for distances on the Earth's surface.

use geo::{Distance, Haversine, Point};

/// Meters per degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Calculate haversine distance between two points in meters
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    Haversine.distance(p1, p2)
}

/// Convert meters to degrees for R-tree pre-filtering.
///
/// Longitude degrees shrink towards the poles, so the conversion uses the
/// latitude of the query point to stay conservative.
pub fn meters_to_degrees_approx(meters: f64, latitude: f64) -> f64 {
    let cos = latitude.to_radians().cos().abs().max(0.01);
    meters / (METERS_PER_DEGREE * cos)
}
