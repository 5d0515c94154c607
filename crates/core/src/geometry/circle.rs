use std::f64::consts::PI;

use geo::{Coord, Destination, Haversine, LineString, MultiPolygon, Point, Polygon};

use crate::units::Meters;

const MIN_STEPS: usize = 8;

/// A geodesic circle around a point.
#[derive(Clone, Copy, Debug)]
pub struct Circle {
    pub center: Point,
    pub radius: Meters,
}

impl Circle {
    pub fn new(center: Point, radius: Meters) -> Self {
        Circle { center, radius }
    }

    /// Polygon approximation with `steps` vertices.
    ///
    /// Vertices sit slightly outside the true circle so every edge is tangent
    /// to it: the polygon contains the whole disc and overshoots by at most
    /// `1/cos(π/steps) − 1` of the radius. Returns `None` for a zero radius,
    /// which degenerates to the centre point and has no area.
    pub fn to_polygon(&self, steps: usize) -> Option<Polygon> {
        if !(self.radius.get() > 0.0) {
            return None;
        }

        let steps = steps.max(MIN_STEPS);
        let vertex_distance = self.radius.get() / (PI / steps as f64).cos();
        let origin_x = self.center.x();

        let mut ring: Vec<Coord> = (0..steps)
            .map(|i| {
                let bearing = 360.0 * i as f64 / steps as f64;
                let p = Haversine.destination(self.center, bearing, vertex_distance);
                Coord {
                    x: unwrap_longitude(p.x(), origin_x),
                    y: p.y(),
                }
            })
            .collect();
        ring.push(ring[0]);

        Some(Polygon::new(LineString::new(ring), vec![]))
    }

    pub fn to_multi_polygon(&self, steps: usize) -> MultiPolygon {
        MultiPolygon::new(self.to_polygon(steps).into_iter().collect())
    }

    pub fn contains_point(&self, point: Point) -> bool {
        use geo::Distance;
        Haversine.distance(self.center, point) <= self.radius.get()
    }
}

/// Keep a ring contiguous across the antimeridian by measuring longitudes
/// relative to the circle's centre.
fn unwrap_longitude(x: f64, origin: f64) -> f64 {
    let mut x = x;
    while x - origin > 180.0 {
        x -= 360.0;
    }
    while x - origin < -180.0 {
        x += 360.0;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Meters;
    use geo::{Contains, Distance};

    #[test]
    fn zero_radius_has_no_polygon() {
        let c = Circle::new(Point::new(0.0, 0.0), Meters(0.0));
        assert!(c.to_polygon(64).is_none());
        assert!(c.to_multi_polygon(64).0.is_empty());
    }

    #[test]
    fn polygon_brackets_the_true_circle() {
        let center = Point::new(2.35, 48.85);
        let radius = Meters::from_miles(10.0);
        let poly = Circle::new(center, radius).to_polygon(360).unwrap();

        for bearing in (0..360).step_by(7) {
            let bearing = bearing as f64 + 0.5;
            let inside = Haversine.destination(center, bearing, radius.get() * 0.9999);
            let outside = Haversine.destination(center, bearing, radius.get() * 1.0001);

            assert!(poly.contains(&inside), "bearing {bearing} inside");
            assert!(!poly.contains(&outside), "bearing {bearing} outside");
        }
    }

    #[test]
    fn crossing_the_antimeridian_stays_contiguous() {
        let poly = Circle::new(Point::new(179.9, 0.0), Meters(50_000.0))
            .to_polygon(32)
            .unwrap();

        assert!(poly.exterior().coords().all(|c| c.x > 179.0 && c.x < 181.0));
    }

    #[test]
    fn point_membership_is_geodesic() {
        let center = Point::new(-74.0, 40.7);
        let circle = Circle::new(center, Meters(1000.0));
        let near = Haversine.destination(center, 45.0, 999.0);
        let far = Haversine.destination(center, 45.0, 1001.0);

        assert!(Haversine.distance(center, near) < 1000.0);
        assert!(circle.contains_point(near));
        assert!(!circle.contains_point(far));
    }
}
