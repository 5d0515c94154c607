//! In-memory transit provider.
//!
//! Stores every station in memory with an R-tree over station
//! locations for nearest-neighbour and radius queries.

use std::collections::HashMap;
use std::sync::Arc;

use geo::Point;
use rstar::RTree;

use crate::identifiers::*;
use crate::models::traits::*;
use crate::spatial::index::StationNode;
use crate::spatial::queries::{haversine_distance, meters_to_degrees_approx};

/// How many R-tree neighbours are re-ranked by geodesic distance when
/// looking for the single nearest station.
const NEAREST_RERANK: usize = 8;

// ============================================================================
// Concrete Implementations of Traits
// ============================================================================

#[derive(Clone, Debug)]
pub struct StationImpl {
    pub id: StationIdentifier,
    pub name: Arc<str>,
    pub location: Point,
    pub line_ids: Vec<LineIdentifier>,
}

impl TransitStation for StationImpl {
    fn id(&self) -> &StationIdentifier {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> Point {
        self.location
    }

    fn line_ids(&self) -> &[LineIdentifier] {
        &self.line_ids
    }
}

/// A line as loaded from source data. Only used to reconcile station
/// membership; stations carry their own line ids afterwards.
#[derive(Clone, Debug)]
pub struct LineImpl {
    pub id: LineIdentifier,
    pub name: Arc<str>,
    pub station_ids: Vec<StationIdentifier>,
}

// ============================================================================
// Static Provider
// ============================================================================

/// In-memory transit provider with spatial indexing
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone)]
pub struct StaticTransitProvider {
    stations: Vec<Arc<StationImpl>>,
    station_map: HashMap<StationIdentifier, Arc<StationImpl>>,

    station_tree: RTree<StationNode>,
}

impl StaticTransitProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self {
            stations: Vec::new(),
            station_map: HashMap::new(),
            station_tree: RTree::new(),
        }
    }

    /// Build a provider from raw data.
    ///
    /// Line membership is reconciled in both directions: a station listed by a
    /// line gains that line id even if its own `line_ids` omitted it.
    pub fn from_data(stations: Vec<StationImpl>, lines: Vec<LineImpl>) -> Self {
        let mut stations = stations;
        let mut by_id: HashMap<StationIdentifier, usize> = HashMap::new();
        for (i, s) in stations.iter().enumerate() {
            by_id.insert(s.id.clone(), i);
        }

        for line in &lines {
            for sid in &line.station_ids {
                if let Some(&i) = by_id.get(sid) {
                    if !stations[i].line_ids.contains(&line.id) {
                        stations[i].line_ids.push(line.id.clone());
                    }
                }
            }
        }

        let stations: Vec<Arc<StationImpl>> = stations.into_iter().map(Arc::new).collect();
        let station_map: HashMap<_, _> = stations
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect();

        let station_tree = RTree::bulk_load(
            stations
                .iter()
                .map(|s| StationNode::new(s.location, s.clone() as Arc<dyn TransitStation>))
                .collect(),
        );

        Self {
            stations,
            station_map,
            station_tree,
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl Default for StaticTransitProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitProvider for StaticTransitProvider {
    fn get_station(&self, id: &StationIdentifier) -> Option<Arc<dyn TransitStation>> {
        self.station_map
            .get(id)
            .map(|s| s.clone() as Arc<dyn TransitStation>)
    }

    fn all_stations(&self) -> Vec<Arc<dyn TransitStation>> {
        self.stations
            .iter()
            .map(|s| s.clone() as Arc<dyn TransitStation>)
            .collect()
    }

    fn stations_on_line(&self, id: &LineIdentifier) -> Vec<Arc<dyn TransitStation>> {
        self.stations
            .iter()
            .filter(|s| s.line_ids.contains(id))
            .map(|s| s.clone() as Arc<dyn TransitStation>)
            .collect()
    }

    fn stations_near(&self, point: Point, radius_m: f64) -> Vec<Arc<dyn TransitStation>> {
        if radius_m <= 0.0 || !radius_m.is_finite() {
            return Vec::new();
        }

        let radius_deg = meters_to_degrees_approx(radius_m, point.y());

        self.station_tree
            .locate_within_distance([point.x(), point.y()], radius_deg * radius_deg)
            .filter(|node| haversine_distance(point, node.station.location()) <= radius_m)
            .map(|node| node.station.clone())
            .collect()
    }

    fn nearest_stations(&self, point: Point, n: usize) -> Vec<Arc<dyn TransitStation>> {
        let mut found: Vec<(f64, Arc<dyn TransitStation>)> = self
            .station_tree
            .nearest_neighbor_iter(&[point.x(), point.y()])
            .take(n.max(NEAREST_RERANK))
            .map(|node| {
                (
                    haversine_distance(point, node.station.location()),
                    node.station.clone(),
                )
            })
            .collect();

        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.into_iter().take(n).map(|(_, s)| s).collect()
    }

    fn nearest_station(&self, point: Point) -> Option<Arc<dyn TransitStation>> {
        self.nearest_stations(point, 1).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, name: &str, x: f64, y: f64) -> StationImpl {
        StationImpl {
            id: StationIdentifier::new(id),
            name: name.into(),
            location: Point::new(x, y),
            line_ids: vec![],
        }
    }

    fn provider() -> StaticTransitProvider {
        let stations = vec![
            station("s1", "Abbey", -0.10, 51.50),
            station("s2", "Apple", -0.12, 51.51),
            station("s3", "Banana", -0.30, 51.60),
        ];
        let lines = vec![LineImpl {
            id: LineIdentifier::new("red"),
            name: "Red Line".into(),
            station_ids: vec![StationIdentifier::new("s1"), StationIdentifier::new("s3")],
        }];
        StaticTransitProvider::from_data(stations, lines)
    }

    #[test]
    fn test_empty_provider() {
        let provider = StaticTransitProvider::new();
        assert!(provider.is_empty());
        assert!(provider.nearest_station(Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_line_membership_is_reconciled() {
        let provider = provider();
        let red = LineIdentifier::new("red");

        let on_line: Vec<_> = provider
            .stations_on_line(&red)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(on_line, vec!["Abbey", "Banana"]);

        let abbey = provider.get_station(&StationIdentifier::new("s1")).unwrap();
        let banana = provider.get_station(&StationIdentifier::new("s3")).unwrap();
        let apple = provider.get_station(&StationIdentifier::new("s2")).unwrap();
        assert!(abbey.shares_line_with(banana.as_ref()));
        assert!(!abbey.shares_line_with(apple.as_ref()));
    }

    #[test]
    fn test_nearest_station() {
        let provider = provider();
        let nearest = provider.nearest_station(Point::new(-0.101, 51.501)).unwrap();
        assert_eq!(nearest.name(), "Abbey");
    }

    #[test]
    fn test_stations_near_uses_meters() {
        let provider = provider();
        let center = Point::new(-0.10, 51.50);

        // Apple is ~1.7 km away, Banana ~16 km.
        let close: Vec<_> = provider
            .stations_near(center, 2_500.0)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(close.len(), 2);
        assert!(close.contains(&"Apple".to_string()));

        assert_eq!(provider.stations_near(center, 50_000.0).len(), 3);
        assert!(provider.stations_near(center, 0.0).is_empty());
    }
}
