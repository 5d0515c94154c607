//! Distance buffers around reference geometry.
//!
//! Point references become unions of geodesic circles. Lines and polygons are
//! buffered in a local equirectangular frame measured in meters, centred on
//! the reference, then mapped back to lon/lat.

use geo::{BoundingRect, Buffer, Coord, Geometry, MapCoords, MultiPolygon, Point};
use zone_transit::spatial::queries::METERS_PER_DEGREE;

use super::{Circle, ops};
use crate::{error::GeometryError, units::Meters};

struct LocalFrame {
    origin: Coord,
    x_scale: f64,
}

impl LocalFrame {
    fn centred_on(geometry: &Geometry) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        let origin = rect.center();
        Some(LocalFrame {
            origin,
            x_scale: origin.y.to_radians().cos().abs().max(0.01) * METERS_PER_DEGREE,
        })
    }

    fn to_meters(&self, c: Coord) -> Coord {
        Coord {
            x: (c.x - self.origin.x) * self.x_scale,
            y: (c.y - self.origin.y) * METERS_PER_DEGREE,
        }
    }

    fn to_degrees(&self, c: Coord) -> Coord {
        Coord {
            x: c.x / self.x_scale + self.origin.x,
            y: c.y / METERS_PER_DEGREE + self.origin.y,
        }
    }
}

fn circles(
    points: impl IntoIterator<Item = Point>,
    distance: Meters,
    steps: usize,
) -> Result<MultiPolygon, GeometryError> {
    ops::union_all(
        points
            .into_iter()
            .filter_map(|p| Circle::new(p, distance).to_polygon(steps))
            .collect(),
    )
}

/// Every point within `distance` of `geometry`.
///
/// A zero distance yields the polygonal part of `geometry` itself (or nothing
/// for points and lines).
pub fn buffer_geodesic(
    geometry: &Geometry,
    distance: Meters,
    steps: usize,
) -> Result<MultiPolygon, GeometryError> {
    match geometry {
        Geometry::Point(p) => circles([*p], distance, steps),
        Geometry::MultiPoint(mp) => circles(mp.0.iter().copied(), distance, steps),
        Geometry::GeometryCollection(gc) => {
            let mut parts = Vec::with_capacity(gc.0.len());
            for g in &gc.0 {
                parts.extend(buffer_geodesic(g, distance, steps)?.0);
            }
            ops::union_all(parts)
        }
        Geometry::Line(_)
        | Geometry::LineString(_)
        | Geometry::MultiLineString(_)
        | Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => {
            let Some(frame) = LocalFrame::centred_on(geometry) else {
                return Ok(super::empty());
            };
            let local = geometry.map_coords(|c| frame.to_meters(c));

            let buffered = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                local.buffer(distance.get().max(0.0))
            }))
            .map_err(|_| GeometryError::BooleanOpPanicked("buffer"))?;

            Ok(buffered.map_coords(|c| frame.to_degrees(c)))
        }
    }
}
