use geo::{Geometry, MultiPoint, Point};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ResolveError, Result},
    geometry::{self, convert},
    question::{
        LandmarkCategory, Marker, QuestionContext, QuestionKey, category::split_full,
        context::lookup_area,
    },
    region::Constraint,
    units::Meters,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MeasuringType {
    Coastline,
    Landmark {
        category: LandmarkCategory,
        full: bool,
    },
    /// Distance to the nearest station.
    RailMeasure,
    CustomMeasure,
}

impl std::fmt::Display for MeasuringType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasuringType::Coastline => f.write_str("coastline"),
            MeasuringType::Landmark { category, full } => {
                write!(f, "{category}{}", if *full { "-full" } else { "" })
            }
            MeasuringType::RailMeasure => f.write_str("rail-measure"),
            MeasuringType::CustomMeasure => f.write_str("custom-measure"),
        }
    }
}

impl std::str::FromStr for MeasuringType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "coastline" => MeasuringType::Coastline,
            "rail-measure" => MeasuringType::RailMeasure,
            "custom-measure" => MeasuringType::CustomMeasure,
            other => {
                let (base, full) = split_full(other);
                let category = base
                    .parse()
                    .map_err(|_| format!("unknown measuring type `{other}`"))?;
                MeasuringType::Landmark { category, full }
            }
        })
    }
}

impl TryFrom<String> for MeasuringType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MeasuringType> for String {
    fn from(value: MeasuringType) -> Self {
        value.to_string()
    }
}

/// "Compared to me, are you closer to or further from {type}?"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuringQuestion {
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub kind: MeasuringType,
    pub hider_closer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<geojson::Geometry>,
    #[serde(flatten)]
    pub marker: Marker,
}

impl MeasuringQuestion {
    pub fn anchor(&self) -> Point {
        geometry::point(self.lat, self.lng)
    }

    /// The reference geometry the distance is measured to.
    async fn reference(&self, key: QuestionKey, ctx: &dyn QuestionContext) -> Result<Geometry> {
        let area = lookup_area(ctx);

        let reference = match self.kind {
            MeasuringType::Coastline => Geometry::MultiLineString(ctx.coastline(area).await?),
            MeasuringType::Landmark { category, .. } => {
                let landmarks = ctx.landmarks(category, area).await?;
                Geometry::MultiPoint(MultiPoint::new(
                    landmarks.iter().map(|l| l.position()).collect(),
                ))
            }
            MeasuringType::RailMeasure => {
                let stations = ctx.stations(area).await?;
                Geometry::MultiPoint(MultiPoint::new(
                    stations.all_stations().iter().map(|s| s.location()).collect(),
                ))
            }
            MeasuringType::CustomMeasure => {
                let geometry = self
                    .geo
                    .as_ref()
                    .ok_or_else(|| ResolveError::missing(key, "custom question without geometry"))?;
                convert::to_geometry(&geometry.value)?
            }
        };

        Ok(reference)
    }

    /// Everything at most the anchor's distance from the reference. Closer
    /// keeps it, further removes it.
    pub async fn to_constraint(
        &self,
        key: QuestionKey,
        ctx: &dyn QuestionContext,
    ) -> Result<Constraint> {
        let reference = self.reference(key, ctx).await?;
        let distance = geometry::distance_to(&reference, self.anchor()).ok_or_else(|| {
            ResolveError::missing(key, format!("nothing to measure for {}", self.kind))
        })?;

        tracing::debug!(key = %key, kind = %self.kind, distance, "measured anchor distance");

        let shape = geometry::buffer_geodesic(&reference, Meters(distance), ctx.config().circle_steps)?;
        Ok(Constraint::polarised(key, self.hider_closer, shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_parse() {
        assert_eq!(
            "hospital-full".parse::<MeasuringType>().unwrap(),
            MeasuringType::Landmark {
                category: LandmarkCategory::Hospital,
                full: true
            }
        );
        assert_eq!("coastline".parse::<MeasuringType>().unwrap(), MeasuringType::Coastline);
        assert_eq!(MeasuringType::RailMeasure.to_string(), "rail-measure");
    }

    #[test]
    fn hider_closer_is_camel_case() {
        let q: MeasuringQuestion = serde_json::from_str(
            r#"{"lat":1,"lng":2,"type":"zoo","hiderCloser":false,"drag":true}"#,
        )
        .unwrap();
        assert!(!q.hider_closer);
        assert!(q.marker.drag);
    }
}
