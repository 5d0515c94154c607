//! R-tree nodes for spatial indexing.
//!
//! ## Two-Stage Filtering
//!
//! 1. **R-tree filter**: Euclidean distance in degrees for fast approximate filtering
//! 2. **Haversine filter**: geodesic distance on the filtered results
//!
//! The degree radius handed to the R-tree is widened by the latitude of the
//! query so the first stage never drops a station the second would keep.

use std::sync::Arc;

use geo::Point;
use rstar::{PointDistance, RTreeObject, AABB};

use crate::models::TransitStation;

#[derive(Clone)]
pub struct StationNode {
    pub station: Arc<dyn TransitStation>,
    point: [f64; 2],
}

impl StationNode {
    pub fn new(location: Point, station: Arc<dyn TransitStation>) -> Self {
        Self {
            station,
            point: [location.x(), location.y()],
        }
    }
}

impl RTreeObject for StationNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StationNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}
