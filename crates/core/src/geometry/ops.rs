//! Guarded polygon set operations.
//!
//! The boolean-op kernel can panic on pathological input. Every operation here
//! runs inside `catch_unwind` and reports a [`GeometryError`] instead of
//! tearing down the recomputation.

use std::panic::{self, AssertUnwindSafe};

use geo::{BooleanOps, MultiPolygon, Orient, Polygon, orient::Direction, unary_union};

use crate::error::GeometryError;

type Result<T> = std::result::Result<T, GeometryError>;

fn guarded(op: &'static str, f: impl FnOnce() -> MultiPolygon) -> Result<MultiPolygon> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|_| {
        tracing::warn!(op, "boolean operation panicked");
        GeometryError::BooleanOpPanicked(op)
    })
}

pub fn intersection(a: &MultiPolygon, b: &MultiPolygon) -> Result<MultiPolygon> {
    if a.0.is_empty() || b.0.is_empty() {
        return Ok(super::empty());
    }
    guarded("intersection", || a.intersection(b))
}

pub fn union(a: &MultiPolygon, b: &MultiPolygon) -> Result<MultiPolygon> {
    if a.0.is_empty() {
        return Ok(b.clone());
    }
    if b.0.is_empty() {
        return Ok(a.clone());
    }
    guarded("union", || a.union(b))
}

pub fn difference(a: &MultiPolygon, b: &MultiPolygon) -> Result<MultiPolygon> {
    if a.0.is_empty() {
        return Ok(super::empty());
    }
    if b.0.is_empty() {
        return Ok(a.clone());
    }
    guarded("difference", || a.difference(b))
}

/// `world − x`. The only place a difference against an arbitrary shape is
/// taken: the world side is always a plain rectangle.
pub fn complement(x: &MultiPolygon) -> Result<MultiPolygon> {
    if x.0.is_empty() {
        return Ok(super::world());
    }
    guarded("complement", || super::world().difference(x))
}

/// Merge possibly-overlapping parts into one non-overlapping multipolygon.
pub fn normalize(region: MultiPolygon) -> Result<MultiPolygon> {
    if region.0.len() <= 1 {
        return Ok(region);
    }
    let oriented: Vec<Polygon> = region
        .0
        .iter()
        .map(|p| p.orient(Direction::Default))
        .collect();
    guarded("normalize", || unary_union(oriented.iter()))
}

/// Union many polygons pairwise so intermediate results stay balanced.
pub fn union_all(polygons: Vec<Polygon>) -> Result<MultiPolygon> {
    tracing::trace!(count = polygons.len(), "union_all");

    let mut current: Vec<MultiPolygon> = polygons
        .into_iter()
        .map(|p| MultiPolygon::new(vec![p]))
        .collect();

    if current.is_empty() {
        return Ok(super::empty());
    }

    while current.len() > 1 {
        let mut next = Vec::with_capacity(current.len().div_ceil(2));
        let mut pairs = current.chunks_exact(2);

        for pair in pairs.by_ref() {
            next.push(union(&pair[0], &pair[1])?);
        }
        if let [last] = pairs.remainder() {
            next.push(last.clone());
        }

        current = next;
    }

    Ok(current.pop().unwrap_or_else(super::empty))
}
