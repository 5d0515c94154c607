//! GeoJSON interchange for regions and reference geometry.

use geo::{Geometry, MultiPolygon, Point, Polygon};
use geojson::{Feature, FeatureCollection, Value};
use serde_json::{Map, json};

use crate::error::GeometryError;

pub fn to_geometry(value: &Value) -> Result<Geometry, GeometryError> {
    Geometry::try_from(value).map_err(|e| GeometryError::Unsupported(e.to_string()))
}

pub fn feature_geometry(feature: &Feature) -> Result<Geometry, GeometryError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| GeometryError::Unsupported("feature has no geometry".into()))?;
    to_geometry(&geometry.value)
}

/// Polygonal parts of a geometry; points and lines are dropped.
pub fn polygons_of(geometry: Geometry) -> MultiPolygon {
    match geometry {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
        Geometry::Triangle(t) => MultiPolygon::new(vec![t.to_polygon()]),
        Geometry::GeometryCollection(gc) => MultiPolygon::new(
            gc.0
                .into_iter()
                .flat_map(|g| polygons_of(g).0)
                .collect::<Vec<Polygon>>(),
        ),
        _ => MultiPolygon::new(vec![]),
    }
}

/// Point parts of a geometry.
pub fn points_of(geometry: &Geometry) -> Vec<Point> {
    match geometry {
        Geometry::Point(p) => vec![*p],
        Geometry::MultiPoint(mp) => mp.0.clone(),
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(points_of).collect(),
        _ => Vec::new(),
    }
}

/// A base boundary from a GeoJSON feature, feature collection or bare geometry.
pub fn boundary_from_geojson(geojson: &geojson::GeoJson) -> Result<MultiPolygon, GeometryError> {
    let parts = match geojson {
        geojson::GeoJson::Geometry(g) => polygons_of(to_geometry(&g.value)?),
        geojson::GeoJson::Feature(f) => polygons_of(feature_geometry(f)?),
        geojson::GeoJson::FeatureCollection(fc) => {
            let mut polygons = Vec::new();
            for f in &fc.features {
                polygons.extend(polygons_of(feature_geometry(f)?).0);
            }
            MultiPolygon::new(polygons)
        }
    };

    if parts.0.is_empty() {
        return Err(GeometryError::Unsupported(
            "boundary contains no polygons".into(),
        ));
    }
    super::normalize(parts)
}

/// A region as a feature carrying `feature_type` and spherical area.
pub fn region_feature(region: &MultiPolygon, feature_type: &str) -> Feature {
    let mut properties = Map::new();
    properties.insert("feature_type".to_string(), json!(feature_type));
    properties.insert(
        "area_sq_km".to_string(),
        json!(super::area_sq_meters(region) / 1_000_000.0),
    );
    properties.insert("polygon_count".to_string(), json!(region.0.len()));

    let hole_count: usize = region.0.iter().map(|p| p.interiors().len()).sum();
    properties.insert("hole_count".to_string(), json!(hole_count));

    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(Value::from(region))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
