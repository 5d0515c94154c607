use std::sync::Arc;

use geo::{BoundingRect, Intersects, MultiPolygon, Polygon};
use zone_transit::TransitStation;

use crate::{
    error::GeometryError,
    geometry::{self, Circle},
    region::FeasibleRegion,
    units::Meters,
};

/// A station circle the hider could still be in.
#[derive(Clone)]
pub struct Candidate {
    pub station: Arc<dyn TransitStation>,
    pub circle: Circle,
    pub zone: Polygon,
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("station", &self.station.id())
            .field("name", &self.station.name())
            .field("radius_m", &self.circle.radius.get())
            .finish()
    }
}

impl Candidate {
    pub fn name(&self) -> &str {
        self.station.name()
    }
}

/// Does any of `zone` lie in the feasible set?
fn overlaps(zone: &Polygon, feasible: &MultiPolygon) -> Result<bool, GeometryError> {
    let (Some(a), Some(b)) = (zone.bounding_rect(), feasible.bounding_rect()) else {
        return Ok(false);
    };
    if !a.intersects(&b) || !zone.intersects(feasible) {
        return Ok(false);
    }

    let shared = geometry::intersection(&geometry::single(zone.clone()), feasible)?;
    Ok(!geometry::is_negligible(&shared))
}

/// One circle per station, keeping those that reach into the feasible region.
///
/// A circle entirely outside the feasible set (wholly inside the displayed
/// mask) cannot hold the hider and is dropped. Output order follows
/// `stations`, so rebuilding from the same input gives the same list.
pub fn build_candidates(
    stations: &[Arc<dyn TransitStation>],
    radius: Meters,
    region: &FeasibleRegion,
    steps: usize,
) -> Result<Vec<Candidate>, GeometryError> {
    let feasible = region.direct_polygons()?;
    let mut candidates = Vec::new();

    for station in stations {
        let circle = Circle::new(station.location(), radius);
        let Some(zone) = circle.to_polygon(steps) else {
            continue;
        };

        if overlaps(&zone, &feasible)? {
            candidates.push(Candidate {
                station: station.clone(),
                circle,
                zone,
            });
        }
    }

    tracing::info!(
        stations = stations.len(),
        candidates = candidates.len(),
        "hiding zones built"
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::testing::square_mp;
    use geo::Point;
    use zone_transit::{StationIdentifier, StationImpl};

    fn station(id: &str, name: &str, lng: f64, lat: f64) -> Arc<dyn TransitStation> {
        Arc::new(StationImpl {
            id: StationIdentifier::new(id),
            name: name.into(),
            location: Point::new(lng, lat),
            line_ids: vec![],
        })
    }

    #[test]
    fn stations_outside_the_region_are_dropped() {
        let stations = vec![
            station("a", "Inside", 0.5, 0.5),
            station("b", "Edge", 1.001, 0.5),
            station("c", "Far", 3.0, 3.0),
        ];
        let region = FeasibleRegion::Direct(square_mp(0.0, 0.0, 1.0));

        let kept = build_candidates(&stations, Meters(800.0), &region, 64).unwrap();
        let names: Vec<_> = kept.iter().map(Candidate::name).collect();
        assert_eq!(names, vec!["Inside", "Edge"]);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let stations = vec![station("a", "A", 0.5, 0.5), station("b", "B", 0.2, 0.9)];
        let region = FeasibleRegion::Direct(square_mp(0.0, 0.0, 1.0))
            .into_complement()
            .unwrap();

        let first = build_candidates(&stations, Meters(500.0), &region, 64).unwrap();
        let second = build_candidates(&stations, Meters(500.0), &region, 64).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.station.id(), b.station.id());
            assert_eq!(a.zone, b.zone);
        }
    }
}
