//! Overpass QL builders.
//!
//! Every query is a pure function of its inputs, so the text doubles as the
//! cache key.

use geo::{Point, Rect};

use crate::question::LandmarkCategory;

/// `(south,west,north,east)` as Overpass expects.
fn bbox(rect: Rect) -> String {
    format!(
        "({:.6},{:.6},{:.6},{:.6})",
        rect.min().y,
        rect.min().x,
        rect.max().y,
        rect.max().x
    )
}

fn header(timeout_secs: u64) -> String {
    format!("[out:json][timeout:{timeout_secs}];")
}

/// Instances of a category as points (`out center` for areas).
pub fn landmarks(category: LandmarkCategory, rect: Rect, timeout_secs: u64) -> String {
    let (key, value) = category.osm_tag();
    let extra = category.refinements().concat();
    format!(
        "{}nwr[\"{key}\"=\"{value}\"]{extra}{};out center;",
        header(timeout_secs),
        bbox(rect)
    )
}

/// Railway stations plus the route relations that reference them.
pub fn stations(rect: Rect, timeout_secs: u64) -> String {
    format!(
        "{}(node[\"railway\"=\"station\"]{b};node[\"public_transport\"=\"station\"]{b};)->.s;.s out;\
         rel(bn.s)[\"type\"=\"route\"];out body;",
        header(timeout_secs),
        b = bbox(rect)
    )
}

pub fn admin_boundary_at(point: Point, admin_level: u8, timeout_secs: u64) -> String {
    format!(
        "{}is_in({:.6},{:.6})->.a;rel(pivot.a)[\"boundary\"=\"administrative\"][\"admin_level\"=\"{admin_level}\"];out geom;",
        header(timeout_secs),
        point.y(),
        point.x()
    )
}

pub fn admin_boundaries(admin_level: u8, rect: Rect, timeout_secs: u64) -> String {
    format!(
        "{}rel[\"boundary\"=\"administrative\"][\"admin_level\"=\"{admin_level}\"]{};out geom;",
        header(timeout_secs),
        bbox(rect)
    )
}

pub fn coastline(rect: Rect, timeout_secs: u64) -> String {
    format!(
        "{}way[\"natural\"=\"coastline\"]{};out geom;",
        header(timeout_secs),
        bbox(rect)
    )
}
