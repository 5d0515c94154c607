//! Planar and geodesic primitives over `geo`.
//!
//! Coordinates are always `(x, y) = (longitude, latitude)` in degrees.
//! Boolean operations are planar in that space; distances are haversine.

pub mod buffer;
pub mod circle;
pub mod convert;
pub mod ops;
pub mod voronoi;

use geo::{
    Area, BoundingRect, ChamberlainDuquetteArea, Closest, Contains, Coord, Distance, Geometry,
    Haversine, HaversineClosestPoint, MultiPolygon, Point, Polygon, Rect,
};

pub use buffer::buffer_geodesic;
pub use circle::Circle;
pub use ops::{complement, difference, intersection, normalize, union, union_all};
pub use voronoi::{VoronoiDiagram, nearer_half_plane};

/// Planar area (square degrees) under which a region counts as empty.
pub const AREA_EPSILON: f64 = 1e-9;

/// The bounding rectangle of the whole sphere in lon/lat.
pub fn world_rect() -> Rect {
    Rect::new(Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 })
}

pub fn world() -> MultiPolygon {
    MultiPolygon::new(vec![world_rect().to_polygon()])
}

pub fn empty() -> MultiPolygon {
    MultiPolygon::new(vec![])
}

/// True when the region has no meaningful area.
pub fn is_negligible(region: &MultiPolygon) -> bool {
    region.unsigned_area() <= AREA_EPSILON
}

/// True when the region covers the whole world rectangle.
pub fn covers_world(region: &MultiPolygon) -> bool {
    world_rect().to_polygon().unsigned_area() - region.unsigned_area() <= AREA_EPSILON
}

/// Spherical area in square meters.
pub fn area_sq_meters(region: &MultiPolygon) -> f64 {
    region.chamberlain_duquette_unsigned_area()
}

/// Bounding box of a region, or `None` when it is empty.
pub fn bounds(region: &MultiPolygon) -> Option<Rect> {
    region.bounding_rect()
}

/// Bounding box grown by `margin_m` meters on every side, clamped to the world.
pub fn expand_rect(rect: Rect, margin_m: f64) -> Rect {
    let mid_lat = (rect.min().y + rect.max().y) / 2.0;
    let dy = margin_m / zone_transit::spatial::queries::METERS_PER_DEGREE;
    let dx = zone_transit::spatial::meters_to_degrees_approx(margin_m, mid_lat);

    Rect::new(
        Coord {
            x: (rect.min().x - dx).max(-180.0),
            y: (rect.min().y - dy).max(-90.0),
        },
        Coord {
            x: (rect.max().x + dx).min(180.0),
            y: (rect.max().y + dy).min(90.0),
        },
    )
}

/// Geodesic distance in meters from `point` to the nearest part of
/// `geometry`; zero inside polygons. `None` for empty geometry.
pub fn distance_to(geometry: &Geometry, point: Point) -> Option<f64> {
    let inside = match geometry {
        Geometry::Polygon(p) => p.contains(&point),
        Geometry::MultiPolygon(mp) => mp.contains(&point),
        _ => false,
    };
    if inside {
        return Some(0.0);
    }

    match geometry.haversine_closest_point(&point) {
        Closest::Intersection(_) => Some(0.0),
        Closest::SinglePoint(p) => Some(Haversine.distance(p, point)),
        Closest::Indeterminate => None,
    }
}

/// Smallest rectangle holding both `rect` and `point`.
pub fn extend_rect(rect: Rect, point: Point) -> Rect {
    Rect::new(
        Coord {
            x: rect.min().x.min(point.x()),
            y: rect.min().y.min(point.y()),
        },
        Coord {
            x: rect.max().x.max(point.x()),
            y: rect.max().y.max(point.y()),
        },
    )
}

pub fn point(lat: f64, lng: f64) -> Point {
    Point::new(lng, lat)
}

pub fn single(polygon: Polygon) -> MultiPolygon {
    MultiPolygon::new(vec![polygon])
}

#[cfg(test)]
pub(crate) mod testing {
    use geo::{Coord, LineString, MultiPolygon, Polygon};

    pub fn square(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::new(
            LineString::new(vec![
                Coord { x, y },
                Coord { x: x + size, y },
                Coord {
                    x: x + size,
                    y: y + size,
                },
                Coord { x, y: y + size },
                Coord { x, y },
            ]),
            vec![],
        )
    }

    pub fn square_mp(x: f64, y: f64, size: f64) -> MultiPolygon {
        MultiPolygon::new(vec![square(x, y, size)])
    }
}
