use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ResolveError, Result},
    geometry::{self, Circle},
    question::{LandmarkCategory, Landmark, Marker, QuestionContext, QuestionKey, QuestionShape},
    region::Constraint,
    units::{Distance as Length, DistanceUnit},
};

/// "Of all the {category} within {radius} of me, which are you closest to?"
///
/// A selected location keeps that instance's Voronoi cell (among the
/// instances in range) inside the circle. `location: false` means the hider
/// is not within the circle at all.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TentacleQuestion {
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
    #[serde(default)]
    pub unit: DistanceUnit,
    pub location_type: LandmarkCategory,
    #[serde(with = "feature_or_false", default)]
    pub location: Option<geojson::Feature>,
    /// Instances found in range by the last lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places: Option<Vec<Landmark>>,
    #[serde(flatten)]
    pub marker: Marker,
}

impl TentacleQuestion {
    pub fn center(&self) -> Point {
        geometry::point(self.lat, self.lng)
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.center(), Length::new(self.radius, self.unit).meters())
    }

    fn selected_point(&self) -> Option<Point> {
        let geometry = self.location.as_ref()?.geometry.as_ref()?;
        match &geometry.value {
            geojson::Value::Point(c) if c.len() >= 2 => Some(Point::new(c[0], c[1])),
            _ => None,
        }
    }

    fn selected_id(&self) -> Option<String> {
        let properties = self.location.as_ref()?.properties.as_ref()?;
        properties
            .get("id")
            .or_else(|| properties.get("osm_id"))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    }

    /// Instances of the category inside the circle.
    pub async fn places_in_range(&self, ctx: &dyn QuestionContext) -> Result<Vec<Landmark>> {
        let circle = self.circle();
        let found = ctx
            .landmarks_near(self.location_type, circle.center, circle.radius.get())
            .await?;
        Ok(found
            .into_iter()
            .filter(|l| circle.contains_point(l.position()))
            .collect())
    }

    pub async fn lower(&self, key: QuestionKey, ctx: &dyn QuestionContext) -> Result<QuestionShape> {
        let steps = ctx.config().circle_steps;
        let circle = self.circle().to_multi_polygon(steps);

        if self.location.is_none() {
            return Ok(Constraint::exclude(key, circle).into());
        }

        let places = self.places_in_range(ctx).await?;
        let selected = self.pick_selected(&places).ok_or_else(|| {
            ResolveError::missing(key, format!("no {} within range", self.location_type))
        })?;

        let Some(bounds) = geometry::bounds(&circle) else {
            return Ok(QuestionShape {
                constraint: Some(Constraint::retain(key, geometry::empty())),
                places: Some(places),
            });
        };

        let generators: Vec<Point> = places.iter().map(Landmark::position).collect();
        let cell = geometry::VoronoiDiagram::new(&generators, bounds)?.cell(selected)?;
        let shape = geometry::intersection(&cell, &circle)?;
        tracing::debug!(key = %key, places = places.len(), "tentacle cell built");

        Ok(QuestionShape {
            constraint: Some(Constraint::retain(key, shape)),
            places: Some(places),
        })
    }

    /// Index of the chosen instance: by id when the feature carries one,
    /// otherwise the instance nearest the feature's point.
    fn pick_selected(&self, places: &[Landmark]) -> Option<usize> {
        if let Some(id) = self.selected_id() {
            if let Some(i) = places.iter().position(|p| p.id == id) {
                return Some(i);
            }
        }

        let target = self.selected_point()?;
        places
            .iter()
            .enumerate()
            .map(|(i, p)| (i, Haversine.distance(p.position(), target)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

/// `location` is either a GeoJSON feature or the literal `false`.
mod feature_or_false {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<geojson::Feature>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(feature) => feature.serialize(serializer),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<geojson::Feature>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Location {
            Flag(bool),
            Feature(Box<geojson::Feature>),
        }

        Ok(match Location::deserialize(deserializer)? {
            Location::Flag(_) => None,
            Location::Feature(f) => Some(*f),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn false_location_round_trips() {
        let q: TentacleQuestion = serde_json::from_str(
            r#"{"lat":1,"lng":2,"radius":1,"unit":"miles","locationType":"museum","location":false}"#,
        )
        .unwrap();
        assert!(q.location.is_none());
        assert_eq!(serde_json::to_value(&q).unwrap()["location"], false);
    }

    #[test]
    fn selected_feature_is_matched_by_id_then_position() {
        let q: TentacleQuestion = serde_json::from_str(
            r#"{"lat":0,"lng":0,"radius":5,"locationType":"zoo","location":
                {"type":"Feature","properties":{"name":"B"},"geometry":{"type":"Point","coordinates":[0.011,0.0]}}}"#,
        )
        .unwrap();

        let places = vec![
            Landmark::new("node/1", Some("A".into()), Point::new(-0.01, 0.0)),
            Landmark::new("node/2", Some("B".into()), Point::new(0.01, 0.0)),
        ];
        assert_eq!(q.pick_selected(&places), Some(1));
    }
}
