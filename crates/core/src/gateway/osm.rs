//! Overpass JSON elements and their conversion to geometry.

use std::collections::HashMap;

use geo::{Contains, Coord, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use geojson::{Feature, FeatureCollection, Value};
use serde::Deserialize;

use crate::question::{AdminArea, Landmark};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    fn coord(&self) -> Coord {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub id: i64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Vec<LatLon>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Way {
        id: i64,
        #[serde(default)]
        center: Option<LatLon>,
        #[serde(default)]
        geometry: Vec<LatLon>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        center: Option<LatLon>,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
}

impl Element {
    /// `node/1`, `way/2`, `relation/3`.
    pub fn osm_id(&self) -> String {
        match self {
            Element::Node { id, .. } => format!("node/{id}"),
            Element::Way { id, .. } => format!("way/{id}"),
            Element::Relation { id, .. } => format!("relation/{id}"),
        }
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        match self {
            Element::Node { tags, .. } | Element::Way { tags, .. } | Element::Relation { tags, .. } => {
                tags
            }
        }
    }

    pub fn name(&self) -> Option<String> {
        let tags = self.tags();
        tags.get("name:en").or_else(|| tags.get("name")).cloned()
    }

    /// Node position or the `out center` centroid of a way/relation.
    pub fn position(&self) -> Option<Point> {
        match self {
            Element::Node { lat, lon, .. } => Some(Point::new(*lon, *lat)),
            Element::Way { center, geometry, .. } => center
                .or_else(|| geometry.first().copied())
                .map(|c| Point::from(c.coord())),
            Element::Relation { center, .. } => center.map(|c| Point::from(c.coord())),
        }
    }

    pub fn line(&self) -> Option<LineString> {
        match self {
            Element::Way { geometry, .. } if geometry.len() >= 2 => {
                Some(geometry.iter().map(LatLon::coord).collect())
            }
            _ => None,
        }
    }

    /// Closed way as a polygon, or a multipolygon/boundary relation assembled
    /// from its outer and inner members.
    pub fn area(&self) -> Option<MultiPolygon> {
        match self {
            Element::Way { .. } => {
                let line = self.line()?;
                (line.0.len() >= 4 && line.is_closed())
                    .then(|| MultiPolygon::new(vec![Polygon::new(line, vec![])]))
            }
            Element::Relation { id, members, .. } => assemble_relation(*id, members),
            Element::Node { .. } => None,
        }
    }
}

/// Fixed-point key so endpoints that differ only by float noise still join.
fn coord_key(coord: &Coord) -> (i64, i64) {
    (
        (coord.x * 10_000_000.0).round() as i64,
        (coord.y * 10_000_000.0).round() as i64,
    )
}

/// Join way segments end to end into closed rings. Segments that never close
/// are dropped.
pub fn assemble_rings(mut segments: Vec<Vec<Coord>>) -> Vec<LineString> {
    segments.retain(|s| s.len() >= 2);

    let mut rings = Vec::new();
    let mut used = vec![false; segments.len()];

    for seed in 0..segments.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let mut ring = segments[seed].clone();

        loop {
            let (Some(first), Some(last)) = (ring.first(), ring.last()) else {
                break;
            };
            let (start, end) = (coord_key(first), coord_key(last));

            if ring.len() >= 4 && start == end {
                rings.push(LineString::new(ring));
                break;
            }

            let next = (0..segments.len()).find_map(|i| {
                if used[i] {
                    return None;
                }
                let s = &segments[i];
                if coord_key(&s[0]) == end {
                    Some((i, false))
                } else if coord_key(&s[s.len() - 1]) == end {
                    Some((i, true))
                } else {
                    None
                }
            });

            let Some((i, reversed)) = next else {
                tracing::debug!(points = ring.len(), "dropping open ring");
                break;
            };
            used[i] = true;
            if reversed {
                ring.extend(segments[i].iter().rev().skip(1).copied());
            } else {
                ring.extend(segments[i].iter().skip(1).copied());
            }
        }
    }

    rings
}

fn assemble_relation(id: i64, members: &[Member]) -> Option<MultiPolygon> {
    let segments = |role: &str| -> Vec<Vec<Coord>> {
        members
            .iter()
            .filter(|m| m.kind == "way" && m.role == role)
            .map(|m| m.geometry.iter().map(LatLon::coord).collect())
            .collect()
    };

    let outers = assemble_rings(segments("outer"));
    if outers.is_empty() {
        tracing::warn!(relation = id, "relation has no closed outer rings");
        return None;
    }
    let inners = assemble_rings(segments("inner"));

    let polygons = outers
        .into_iter()
        .map(|outer| {
            let shell = Polygon::new(outer.clone(), vec![]);
            let holes = inners
                .iter()
                .filter(|inner| {
                    inner
                        .0
                        .first()
                        .is_some_and(|c| shell.contains(&Point::from(*c)))
                })
                .cloned()
                .collect();
            Polygon::new(outer, holes)
        })
        .collect();

    Some(MultiPolygon::new(polygons))
}

impl OverpassResponse {
    pub fn landmarks(&self) -> Vec<Landmark> {
        self.elements
            .iter()
            .filter_map(|e| Some(Landmark::new(e.osm_id(), e.name(), e.position()?)))
            .collect()
    }

    pub fn admin_areas(&self) -> Vec<AdminArea> {
        self.elements
            .iter()
            .filter_map(|e| {
                let boundary = e.area()?;
                Some(AdminArea {
                    id: e.osm_id(),
                    name: e.name(),
                    admin_level: e
                        .tags()
                        .get("admin_level")
                        .and_then(|l| l.parse().ok())
                        .unwrap_or_default(),
                    boundary,
                })
            })
            .collect()
    }

    pub fn lines(&self) -> MultiLineString {
        MultiLineString::new(self.elements.iter().filter_map(Element::line).collect())
    }

    /// Every element as a GeoJSON feature with its tags and id as properties.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .elements
            .iter()
            .filter_map(|e| {
                let value = match (e.area(), e.line(), e.position()) {
                    (Some(area), _, _) => Value::from(&area),
                    (None, Some(line), _) => Value::from(&line),
                    (None, None, Some(point)) => Value::from(&point),
                    _ => return None,
                };

                let mut properties: serde_json::Map<String, serde_json::Value> = e
                    .tags()
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                properties.insert("id".into(), e.osm_id().into());

                Some(Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(value)),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                })
            })
            .collect();

        crate::geometry::convert::collection(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    const BOUNDARY: &str = r#"{"elements":[
        {"type":"relation","id":9,"tags":{"name":"Square","admin_level":"4"},"members":[
            {"type":"way","ref":1,"role":"outer","geometry":[{"lat":0,"lon":0},{"lat":0,"lon":2}]},
            {"type":"way","ref":2,"role":"outer","geometry":[{"lat":2,"lon":0},{"lat":2,"lon":2},{"lat":0,"lon":2}]},
            {"type":"way","ref":3,"role":"outer","geometry":[{"lat":2,"lon":0},{"lat":0,"lon":0}]},
            {"type":"way","ref":4,"role":"inner","geometry":[{"lat":0.5,"lon":0.5},{"lat":0.5,"lon":1},{"lat":1,"lon":1},{"lat":0.5,"lon":0.5}]}
        ]}
    ]}"#;

    #[test]
    fn relation_rings_are_joined_with_holes() {
        let response: OverpassResponse = serde_json::from_str(BOUNDARY).unwrap();
        let areas = response.admin_areas();

        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].admin_level, 4);
        assert_eq!(areas[0].name.as_deref(), Some("Square"));
        assert_eq!(areas[0].boundary.0[0].interiors().len(), 1);
        assert!((areas[0].boundary.unsigned_area() - 3.875).abs() < 1e-9);
    }

    #[test]
    fn nodes_and_centres_become_landmarks() {
        let response: OverpassResponse = serde_json::from_str(
            r#"{"elements":[
                {"type":"node","id":1,"lat":51.5,"lon":-0.1,"tags":{"name":"Zoo"}},
                {"type":"way","id":2,"center":{"lat":51.6,"lon":-0.2},"tags":{}},
                {"type":"relation","id":3,"members":[]}
            ]}"#,
        )
        .unwrap();

        let landmarks = response.landmarks();
        assert_eq!(landmarks.len(), 2);
        assert_eq!(landmarks[0].id, "node/1");
        assert_eq!(landmarks[0].name.as_deref(), Some("Zoo"));
        assert_eq!(landmarks[1].position(), Point::new(-0.2, 51.6));
    }

    #[test]
    fn unclosed_segments_are_dropped() {
        let rings = assemble_rings(vec![vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }]]);
        assert!(rings.is_empty());
    }

    #[test]
    fn feature_collection_carries_tags() {
        let response: OverpassResponse = serde_json::from_str(BOUNDARY).unwrap();
        let fc = response.to_feature_collection();
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["id"], "relation/9");
        assert_eq!(props["name"], "Square");
    }
}
