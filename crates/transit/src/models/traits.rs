//! Core traits for transit entities.
//!
//! The hiding-zone pipeline only cares about where a station is, what it is
//! called and which lines stop there. Implementations can be in-memory or
//! built from remote lookups.

use geo::Point;
use std::sync::Arc;

use crate::identifiers::*;

/// A station a hider may pick as the centre of their hiding zone.
pub trait TransitStation: Send + Sync {
    fn id(&self) -> &StationIdentifier;
    fn name(&self) -> &str;
    fn location(&self) -> Point;

    /// Lines serving this station. Empty when line membership is unknown.
    fn line_ids(&self) -> &[LineIdentifier];

    fn serves_line(&self, line: &LineIdentifier) -> bool {
        self.line_ids().contains(line)
    }

    /// True when both stations share at least one line.
    fn shares_line_with(&self, other: &dyn TransitStation) -> bool {
        self.line_ids().iter().any(|l| other.serves_line(l))
    }
}

/// Provider of station data with line membership and spatial queries.
pub trait TransitProvider: Send + Sync {
    // ---- Lookups ----
    fn get_station(&self, id: &StationIdentifier) -> Option<Arc<dyn TransitStation>>;

    // ---- Collections ----
    fn all_stations(&self) -> Vec<Arc<dyn TransitStation>>;
    fn stations_on_line(&self, id: &LineIdentifier) -> Vec<Arc<dyn TransitStation>>;

    // ---- Spatial queries ----

    /// Find stations within radius (meters)
    fn stations_near(&self, point: Point, radius_m: f64) -> Vec<Arc<dyn TransitStation>>;

    /// Find the N nearest stations to a point, closest first
    fn nearest_stations(&self, point: Point, n: usize) -> Vec<Arc<dyn TransitStation>>;

    /// The single closest station, by geodesic distance
    fn nearest_station(&self, point: Point) -> Option<Arc<dyn TransitStation>>;
}
