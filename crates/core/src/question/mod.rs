use std::hash::{Hash, Hasher};

use geo::Point;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

use crate::region::Constraint;

pub mod category;
pub mod context;
pub mod matching;
pub mod measuring;
pub mod radius;
pub mod tentacle;
pub mod thermometer;

pub use category::LandmarkCategory;
pub use context::{AdminArea, Landmark, QuestionContext};
pub use matching::{MatchingQuestion, MatchingType, StationComparator};
pub use measuring::{MeasuringQuestion, MeasuringType};
pub use radius::RadiusQuestion;
pub use tentacle::TentacleQuestion;
pub use thermometer::ThermometerQuestion;

/// Stable identifier of a question across edits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionKey(pub f64);

impl PartialEq for QuestionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for QuestionKey {}

impl Hash for QuestionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl std::fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display state shared by every question.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// The owner is still moving the question around; unlocked.
    #[serde(default)]
    pub drag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QuestionKind {
    Radius(RadiusQuestion),
    Thermometer(ThermometerQuestion),
    Tentacles(TentacleQuestion),
    Matching(MatchingQuestion),
    Measuring(MeasuringQuestion),
}

impl QuestionKind {
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionKind::Radius(_) => "radius",
            QuestionKind::Thermometer(_) => "thermometer",
            QuestionKind::Tentacles(_) => "tentacles",
            QuestionKind::Matching(_) => "matching",
            QuestionKind::Measuring(_) => "measuring",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    pub key: QuestionKey,
    pub kind: QuestionKind,
}

/// `{ id, key, data }` as exchanged between players.
#[derive(Deserialize)]
struct RawQuestion {
    id: String,
    key: QuestionKey,
    data: serde_json::Value,
}

impl TryFrom<RawQuestion> for Question {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let data = raw.data;
        let kind = match raw.id.as_str() {
            "radius" => serde_json::from_value(data).map(QuestionKind::Radius),
            "thermometer" => serde_json::from_value(data).map(QuestionKind::Thermometer),
            "tentacles" => serde_json::from_value(data).map(QuestionKind::Tentacles),
            "matching" => serde_json::from_value(data).map(QuestionKind::Matching),
            "measuring" => serde_json::from_value(data).map(QuestionKind::Measuring),
            other => return Err(format!("unknown question type `{other}`")),
        }
        .map_err(|e| format!("question {} ({}): {e}", raw.key, raw.id))?;

        Ok(Question { key: raw.key, kind })
    }
}

impl Serialize for Question {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut raw = serializer.serialize_struct("Question", 3)?;
        raw.serialize_field("id", self.kind.tag())?;
        raw.serialize_field("key", &self.key)?;
        match &self.kind {
            QuestionKind::Radius(q) => raw.serialize_field("data", q)?,
            QuestionKind::Thermometer(q) => raw.serialize_field("data", q)?,
            QuestionKind::Tentacles(q) => raw.serialize_field("data", q)?,
            QuestionKind::Matching(q) => raw.serialize_field("data", q)?,
            QuestionKind::Measuring(q) => raw.serialize_field("data", q)?,
        }
        raw.end()
    }
}

/// What lowering a question produced.
#[derive(Debug, Default)]
pub struct QuestionShape {
    /// `None` when the question does not constrain the display region.
    pub constraint: Option<Constraint>,
    /// Landmarks found in range, written back onto tentacle questions.
    pub places: Option<Vec<Landmark>>,
}

impl From<Constraint> for QuestionShape {
    fn from(constraint: Constraint) -> Self {
        QuestionShape {
            constraint: Some(constraint),
            places: None,
        }
    }
}

impl Question {
    pub fn marker(&self) -> &Marker {
        match &self.kind {
            QuestionKind::Radius(q) => &q.marker,
            QuestionKind::Thermometer(q) => &q.marker,
            QuestionKind::Tentacles(q) => &q.marker,
            QuestionKind::Matching(q) => &q.marker,
            QuestionKind::Measuring(q) => &q.marker,
        }
    }

    /// True while the owner is editing the question.
    pub fn is_unlocked(&self) -> bool {
        self.marker().drag
    }

    /// The point the seeker asked from. For thermometers, the end point.
    pub fn anchor(&self) -> Point {
        match &self.kind {
            QuestionKind::Radius(q) => q.center(),
            QuestionKind::Thermometer(q) => q.end(),
            QuestionKind::Tentacles(q) => q.center(),
            QuestionKind::Matching(q) => q.anchor(),
            QuestionKind::Measuring(q) => q.anchor(),
        }
    }

    /// Store landmarks found while lowering. Only tentacle questions keep them.
    pub fn set_places(&mut self, places: Vec<Landmark>) {
        if let QuestionKind::Tentacles(q) = &mut self.kind {
            q.places = Some(places);
        }
    }

    /// Reduce the question to a shape to fold into the feasible region.
    pub async fn lower(&self, ctx: &dyn QuestionContext) -> crate::error::Result<QuestionShape> {
        let steps = ctx.config().circle_steps;
        tracing::debug!(key = %self.key, kind = self.kind.tag(), "lowering question");

        match &self.kind {
            QuestionKind::Radius(q) => Ok(q.to_constraint(self.key, steps).into()),
            QuestionKind::Thermometer(q) => Ok(q.to_constraint(self.key)?.into()),
            QuestionKind::Tentacles(q) => q.lower(self.key, ctx).await,
            QuestionKind::Matching(q) => Ok(QuestionShape {
                constraint: q.to_constraint(self.key, ctx).await?,
                places: None,
            }),
            QuestionKind::Measuring(q) => Ok(q.to_constraint(self.key, ctx).await?.into()),
        }
    }
}
