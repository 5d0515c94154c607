use geo::{MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    error::{GeometryError, ResolveError, Result},
    geometry::{self, convert},
    question::{
        LandmarkCategory, Marker, QuestionContext, QuestionKey, category::split_full,
        context::lookup_area,
    },
    region::Constraint,
};

/// How two stations are compared by a station-matching question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StationComparator {
    FirstLetter,
    NameLength,
    SharedLine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MatchingType {
    /// "Is your nearest {category} the same as mine?"
    Landmark {
        category: LandmarkCategory,
        full: bool,
    },
    /// "Are you in the same administrative zone as me?"
    Zone,
    /// "Does your zone start with the same letter as mine?"
    LetterZone,
    Station(StationComparator),
    CustomZone,
    CustomPoints,
}

impl std::fmt::Display for MatchingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchingType::Landmark {
                category,
                full: false,
            } => write!(f, "{category}"),
            MatchingType::Landmark {
                category,
                full: true,
            } => write!(f, "{category}-full"),
            MatchingType::Zone => f.write_str("zone"),
            MatchingType::LetterZone => f.write_str("letter-zone"),
            MatchingType::Station(StationComparator::FirstLetter) => {
                f.write_str("same-first-letter-station")
            }
            MatchingType::Station(StationComparator::NameLength) => {
                f.write_str("same-length-station")
            }
            MatchingType::Station(StationComparator::SharedLine) => f.write_str("same-train-line"),
            MatchingType::CustomZone => f.write_str("custom-zone"),
            MatchingType::CustomPoints => f.write_str("custom-points"),
        }
    }
}

impl std::str::FromStr for MatchingType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "zone" => MatchingType::Zone,
            "letter-zone" => MatchingType::LetterZone,
            "same-first-letter-station" => MatchingType::Station(StationComparator::FirstLetter),
            "same-length-station" => MatchingType::Station(StationComparator::NameLength),
            "same-train-line" => MatchingType::Station(StationComparator::SharedLine),
            "custom-zone" => MatchingType::CustomZone,
            "custom-points" => MatchingType::CustomPoints,
            other => {
                let (base, full) = split_full(other);
                let category = base
                    .parse()
                    .map_err(|_| format!("unknown matching type `{other}`"))?;
                MatchingType::Landmark { category, full }
            }
        })
    }
}

impl TryFrom<String> for MatchingType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MatchingType> for String {
    fn from(value: MatchingType) -> Self {
        value.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneCategory {
    pub admin_level: u8,
}

/// "Is your {type} the same as mine?"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchingQuestion {
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub kind: MatchingType,
    pub same: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cat: Option<ZoneCategory>,
    /// Hand-drawn geometry for the custom types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<geojson::Geometry>,
    #[serde(flatten)]
    pub marker: Marker,
}

/// Upper-cased first grapheme of a name.
pub fn first_letter(name: &str) -> Option<String> {
    name.trim()
        .graphemes(true)
        .next()
        .map(|g| g.to_uppercase())
}

pub fn name_length(name: &str) -> usize {
    name.graphemes(true).count()
}

/// The Voronoi cell, among `generators`, that holds `anchor`.
pub(crate) fn nearest_cell(
    generators: &[Point],
    anchor: Point,
    bounds: Rect,
) -> Result<MultiPolygon, GeometryError> {
    let diagram = geometry::VoronoiDiagram::new(generators, bounds)?;
    Ok(diagram
        .cell_containing(anchor)?
        .map(|(_, cell)| cell)
        .unwrap_or_else(geometry::empty))
}

impl MatchingQuestion {
    pub fn anchor(&self) -> Point {
        geometry::point(self.lat, self.lng)
    }

    pub fn station_comparator(&self) -> Option<StationComparator> {
        match self.kind {
            MatchingType::Station(c) => Some(c),
            _ => None,
        }
    }

    fn admin_level(&self, key: QuestionKey) -> Result<u8> {
        self.cat
            .map(|c| c.admin_level)
            .ok_or_else(|| ResolveError::missing(key, "zone question without an admin level"))
    }

    fn custom_geometry(&self, key: QuestionKey) -> Result<geo::Geometry> {
        let geometry = self
            .geo
            .as_ref()
            .ok_or_else(|| ResolveError::missing(key, "custom question without geometry"))?;
        Ok(convert::to_geometry(&geometry.value)?)
    }

    /// Station comparators return `None`: they only act on hiding zones.
    pub async fn to_constraint(
        &self,
        key: QuestionKey,
        ctx: &dyn QuestionContext,
    ) -> Result<Option<Constraint>> {
        let shape = match self.kind {
            MatchingType::Station(_) => return Ok(None),

            MatchingType::Landmark { category, .. } => {
                let area = lookup_area(ctx);
                let landmarks = ctx.landmarks(category, area).await?;
                if landmarks.is_empty() {
                    return Err(ResolveError::missing(key, format!("no {category} found")));
                }
                let generators: Vec<Point> = landmarks.iter().map(|l| l.position()).collect();
                nearest_cell(&generators, self.anchor(), area)?
            }

            MatchingType::Zone => {
                let level = self.admin_level(key)?;
                ctx.admin_area_at(self.anchor(), level)
                    .await?
                    .ok_or_else(|| ResolveError::missing(key, "anchor is in no zone"))?
                    .boundary
            }

            MatchingType::LetterZone => {
                let level = self.admin_level(key)?;
                let own = ctx
                    .admin_area_at(self.anchor(), level)
                    .await?
                    .ok_or_else(|| ResolveError::missing(key, "anchor is in no zone"))?;
                let letter = own
                    .name
                    .as_deref()
                    .and_then(first_letter)
                    .ok_or_else(|| ResolveError::missing(key, "anchor zone has no name"))?;

                let areas = ctx.admin_areas(level, lookup_area(ctx)).await?;
                let polygons = areas
                    .into_iter()
                    .filter(|a| a.name.as_deref().and_then(first_letter).as_ref() == Some(&letter))
                    .flat_map(|a| a.boundary.0)
                    .chain(own.boundary.0)
                    .collect();
                geometry::union_all(polygons)?
            }

            MatchingType::CustomZone => {
                convert::polygons_of(self.custom_geometry(key)?)
            }

            MatchingType::CustomPoints => {
                let points = convert::points_of(&self.custom_geometry(key)?);
                if points.is_empty() {
                    return Err(ResolveError::missing(key, "custom points are empty"));
                }
                let mut area = lookup_area(ctx);
                for p in &points {
                    area = geometry::extend_rect(area, *p);
                }
                nearest_cell(&points, self.anchor(), area)?
            }
        };

        Ok(Some(Constraint::polarised(key, self.same, shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_parse() {
        assert_eq!(
            "museum-full".parse::<MatchingType>().unwrap(),
            MatchingType::Landmark {
                category: LandmarkCategory::Museum,
                full: true
            }
        );
        assert_eq!(
            "same-train-line".parse::<MatchingType>().unwrap(),
            MatchingType::Station(StationComparator::SharedLine)
        );
        assert!("volcano".parse::<MatchingType>().is_err());

        for name in ["major-city", "letter-zone", "custom-points", "golf_course-full"] {
            assert_eq!(name.parse::<MatchingType>().unwrap().to_string(), name);
        }
    }

    #[test]
    fn letters_are_graphemes() {
        assert_eq!(first_letter("  émile").as_deref(), Some("É"));
        assert_eq!(first_letter("abbey").as_deref(), Some("A"));
        assert_eq!(first_letter(""), None);
        assert_eq!(name_length("Noël"), 4);
    }

    #[test]
    fn nearest_cell_holds_the_anchor() {
        use geo::Contains;

        let generators = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let bounds = Rect::new(geo::Coord { x: -2.0, y: -2.0 }, geo::Coord { x: 3.0, y: 2.0 });
        let cell = nearest_cell(&generators, Point::new(0.9, 0.1), bounds).unwrap();

        assert!(cell.contains(&Point::new(0.8, 0.0)));
        assert!(!cell.contains(&Point::new(0.2, 0.0)));
    }

    #[test]
    fn anchors_stay_in_their_cell_far_from_the_equator() {
        use geo::Intersects;

        let generators = [Point::new(0.0, 40.0), Point::new(6.0, 60.0)];
        let bounds = Rect::new(geo::Coord { x: -20.0, y: 30.0 }, geo::Coord { x: 30.0, y: 70.0 });

        let mut outside = Vec::new();
        for i in 0..=50 {
            for j in 0..=40 {
                let anchor = Point::new(-20.0 + i as f64, 30.0 + j as f64);
                let cell = nearest_cell(&generators, anchor, bounds).unwrap();
                if !cell.intersects(&anchor) {
                    outside.push(anchor);
                }
            }
        }
        assert!(outside.is_empty(), "anchors outside their cell: {outside:?}");
    }
}
