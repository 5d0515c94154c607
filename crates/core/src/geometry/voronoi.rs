//! Voronoi cells over a Delaunay triangulation.
//!
//! Sites are triangulated in a local equirectangular frame (longitudes scaled
//! by the cosine of the sites' mean latitude), so bisectors approximate
//! geodesic equidistance over play-area-sized regions. Nearest-site lookups
//! use the same frame: a point always lies in the cell of the site
//! [`VoronoiDiagram::nearest`] reports for it.

use geo::{Coord, LineString, MapCoords, MultiPolygon, Point, Polygon, Rect};
use spade::{DelaunayTriangulation, HasPosition, Point2, Triangulation, handles::FixedVertexHandle};

use super::ops;
use crate::error::GeometryError;

type Result<T> = std::result::Result<T, GeometryError>;

/// Linear map between lon/lat and the local frame.
#[derive(Clone, Copy, Debug)]
struct Frame {
    x_scale: f64,
}

impl Frame {
    fn around<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let (sum, n) = points
            .into_iter()
            .fold((0.0, 0usize), |(s, n), p| (s + p.y(), n + 1));
        let mean_lat = if n == 0 { 0.0 } else { sum / n as f64 };

        Frame {
            x_scale: mean_lat.to_radians().cos().abs().max(0.01),
        }
    }

    fn forward(&self, c: Coord) -> Coord {
        Coord {
            x: c.x * self.x_scale,
            y: c.y,
        }
    }

    fn inverse(&self, c: Coord) -> Coord {
        Coord {
            x: c.x / self.x_scale,
            y: c.y,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Site {
    position: Point2<f64>,
    index: usize,
}

impl HasPosition for Site {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// Voronoi partition of `bounds` among a set of sites.
///
/// Sites at identical coordinates share one cell.
pub struct VoronoiDiagram {
    frame: Frame,
    window: Rect,
    triangulation: DelaunayTriangulation<Site>,
    handles: Vec<FixedVertexHandle>,
}

impl VoronoiDiagram {
    pub fn new(sites: &[Point], bounds: Rect) -> Result<Self> {
        let frame = Frame::around(sites);
        let mut triangulation = DelaunayTriangulation::<Site>::new();
        let mut handles = Vec::with_capacity(sites.len());

        for (index, site) in sites.iter().enumerate() {
            let c = frame.forward(site.0);
            let position = spade::mitigate_underflow(Point2::new(c.x, c.y));
            let handle = triangulation
                .insert(Site { position, index })
                .map_err(|e| GeometryError::Unsupported(format!("voronoi site {index}: {e}")))?;
            handles.push(handle);
        }

        let window = Rect::new(frame.forward(bounds.min()), frame.forward(bounds.max()));
        Ok(VoronoiDiagram {
            frame,
            window,
            triangulation,
            handles,
        })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Index of the site whose cell holds `point`.
    pub fn nearest(&self, point: Point) -> Option<usize> {
        let c = self.frame.forward(point.0);
        self.triangulation
            .nearest_neighbor(Point2::new(c.x, c.y))
            .map(|v| v.data().index)
    }

    /// The cell of site `index`, clipped to the bounds. Empty for an unknown
    /// index or a cell that lies wholly outside the bounds.
    pub fn cell(&self, index: usize) -> Result<MultiPolygon> {
        let Some(&handle) = self.handles.get(index) else {
            return Ok(super::empty());
        };
        let vertex = self.triangulation.vertex(handle);
        let site = to_coord(vertex.position());

        // Only Delaunay neighbours bound a cell.
        let mut cell = super::single(self.window.to_polygon());
        for edge in vertex.out_edges() {
            let other = to_coord(edge.to().position());
            let half = super::single(nearer_quad(site, other, self.window));
            cell = ops::intersection(&cell, &half)?;
            if cell.0.is_empty() {
                break;
            }
        }

        Ok(cell.map_coords(|c| self.frame.inverse(c)))
    }

    /// The cell holding `point`, with the index of its site.
    pub fn cell_containing(&self, point: Point) -> Result<Option<(usize, MultiPolygon)>> {
        let Some(index) = self.nearest(point) else {
            return Ok(None);
        };
        Ok(Some((index, self.cell(index)?)))
    }
}

fn to_coord(p: Point2<f64>) -> Coord {
    Coord { x: p.x, y: p.y }
}

/// The side of the `site`/`other` bisector nearer `site`, cut to a square
/// large enough to cover `window`.
fn nearer_quad(site: Coord, other: Coord, window: Rect) -> Polygon {
    let mid = (site + other) / 2.0;
    let along = other - site;
    let normal = along / along.x.hypot(along.y);
    let tangent = Coord {
        x: -normal.y,
        y: normal.x,
    };

    let to_center = window.center() - mid;
    let reach = to_center.x.hypot(to_center.y) + window.width().hypot(window.height());
    let (t, n) = (tangent * reach, normal * reach);

    Polygon::new(
        LineString::new(vec![mid + t, mid - t, mid - t - n, mid + t - n, mid + t]),
        vec![],
    )
}

/// The part of `bounds` nearer to `target` than to `other`.
///
/// Swapping the arguments yields the complementary half. Identical points
/// give the whole of `bounds`.
pub fn nearer_half_plane(target: Point, other: Point, bounds: Rect) -> Result<MultiPolygon> {
    VoronoiDiagram::new(&[target, other], bounds)?.cell(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Intersects};

    fn bounds() -> Rect {
        Rect::new(Coord { x: -10.0, y: -10.0 }, Coord { x: 10.0, y: 10.0 })
    }

    fn cells(diagram: &VoronoiDiagram) -> Vec<MultiPolygon> {
        (0..diagram.len()).map(|i| diagram.cell(i).unwrap()).collect()
    }

    #[test]
    fn two_sites_split_the_box() {
        let diagram =
            VoronoiDiagram::new(&[Point::new(-5.0, 0.0), Point::new(5.0, 0.0)], bounds()).unwrap();
        let cells = cells(&diagram);

        assert!((cells[0].unsigned_area() - 200.0).abs() < 1e-9);
        assert!(cells[0].contains(&Point::new(-1.0, 9.0)));
        assert!(cells[1].contains(&Point::new(1.0, -9.0)));
    }

    #[test]
    fn cells_tile_the_bounds() {
        let sites = [
            Point::new(-3.0, -2.0),
            Point::new(4.0, 1.0),
            Point::new(0.5, 6.0),
            Point::new(-7.0, 5.0),
            Point::new(2.0, -8.0),
        ];
        let diagram = VoronoiDiagram::new(&sites, bounds()).unwrap();
        let total: f64 = cells(&diagram).iter().map(|c| c.unsigned_area()).sum();

        assert!((total - 400.0).abs() < 1e-6);
    }

    #[test]
    fn each_site_lies_in_its_own_cell() {
        let sites = [
            Point::new(1.0, 1.0),
            Point::new(2.0, 5.0),
            Point::new(-6.0, -6.0),
        ];
        let diagram = VoronoiDiagram::new(&sites, bounds()).unwrap();
        for (i, site) in sites.iter().enumerate() {
            assert!(diagram.cell(i).unwrap().contains(site));
            assert_eq!(diagram.nearest(*site), Some(i));
        }
    }

    #[test]
    fn duplicate_sites_share_a_cell() {
        let diagram =
            VoronoiDiagram::new(&[Point::new(0.0, 0.0), Point::new(0.0, 0.0)], bounds()).unwrap();
        let cells = cells(&diagram);

        assert_eq!(cells[0], cells[1]);
        assert!((cells[0].unsigned_area() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn far_sites_still_cut_the_bounds() {
        let diagram = VoronoiDiagram::new(
            &[Point::new(0.0, 0.0), Point::new(60.0, 0.0), Point::new(-60.0, 5.0)],
            bounds(),
        )
        .unwrap();

        assert!((diagram.cell(0).unwrap().unsigned_area() - 400.0).abs() < 1e-6);
        assert!(diagram.cell(1).unwrap().0.is_empty());
    }

    #[test]
    fn lookups_agree_with_cells_at_high_latitude() {
        let sites = [Point::new(0.0, 40.0), Point::new(6.0, 60.0), Point::new(-9.0, 55.0)];
        let bounds = Rect::new(Coord { x: -20.0, y: 30.0 }, Coord { x: 30.0, y: 70.0 });
        let diagram = VoronoiDiagram::new(&sites, bounds).unwrap();
        let cells = cells(&diagram);

        for i in 0..=50 {
            for j in 0..=40 {
                let point = Point::new(-20.0 + i as f64, 30.0 + j as f64);
                let index = diagram.nearest(point).unwrap();
                assert!(cells[index].intersects(&point), "{point:?} outside cell {index}");
            }
        }
    }

    #[test]
    fn half_planes_are_complementary() {
        let a = Point::new(-1.0, 2.0);
        let b = Point::new(3.0, -1.0);
        let near_a = nearer_half_plane(a, b, bounds()).unwrap();
        let near_b = nearer_half_plane(b, a, bounds()).unwrap();

        assert!((near_a.unsigned_area() + near_b.unsigned_area() - 400.0).abs() < 1e-6);
        assert!(near_a.contains(&a));
        assert!(near_b.contains(&b));
    }
}
