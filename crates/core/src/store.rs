//! Ordered question list, base boundary and planning mode.

use geo::MultiPolygon;

use crate::{
    geometry::convert,
    question::{Question, QuestionKey},
};

/// A parsed game-state payload.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    /// Boundary carried by a GeoJSON payload, if any.
    pub boundary: Option<MultiPolygon>,
    pub questions: Vec<Question>,
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is neither a question array nor a feature")]
    Shape,

    #[error("feature has no `questions` property")]
    MissingQuestions,

    #[error(transparent)]
    Geometry(#[from] crate::error::GeometryError),
}

impl GameState {
    /// Parse either a bare question array or a GeoJSON feature whose
    /// `properties.questions` holds the array and whose geometry is the boundary.
    pub fn from_json(text: &str) -> Result<Self, PayloadError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match value {
            serde_json::Value::Array(_) => Ok(GameState {
                boundary: None,
                questions: serde_json::from_value(value)?,
            }),
            serde_json::Value::Object(_) => {
                let feature: geojson::Feature = serde_json::from_value(value)?;
                Self::from_feature(&feature)
            }
            _ => Err(PayloadError::Shape),
        }
    }

    fn from_feature(feature: &geojson::Feature) -> Result<Self, PayloadError> {
        let questions = feature
            .property("questions")
            .ok_or(PayloadError::MissingQuestions)?;
        let questions: Vec<Question> = serde_json::from_value(questions.clone())?;

        let boundary = match feature.geometry {
            Some(ref g) => Some(convert::polygons_of(convert::to_geometry(&g.value)?))
                .filter(|mp| !mp.0.is_empty()),
            None => None,
        };

        Ok(GameState {
            boundary,
            questions,
        })
    }
}

/// The questions of one game, owned by the engine between recomputations.
#[derive(Debug, Clone)]
pub struct QuestionStore {
    questions: Vec<Question>,
    boundary: MultiPolygon,
    planning_mode: bool,
}

impl QuestionStore {
    pub fn new(boundary: MultiPolygon, questions: Vec<Question>) -> Self {
        QuestionStore {
            questions,
            boundary,
            planning_mode: false,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Questions that take part in a recomputation. Unlocked questions are
    /// left out while planning mode is on.
    pub fn active_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .filter(move |q| !(self.planning_mode && q.is_unlocked()))
    }

    pub fn boundary(&self) -> &MultiPolygon {
        &self.boundary
    }

    /// Replace the boundary. Returns whether it actually changed.
    pub fn set_boundary(&mut self, boundary: MultiPolygon) -> bool {
        if self.boundary == boundary {
            return false;
        }
        self.boundary = boundary;
        true
    }

    pub fn planning_mode(&self) -> bool {
        self.planning_mode
    }

    pub fn set_planning_mode(&mut self, on: bool) {
        self.planning_mode = on;
    }

    pub fn push(&mut self, question: Question) {
        self.questions.push(question);
    }

    /// Replace a question in place, keeping its position.
    pub fn replace(&mut self, question: Question) -> bool {
        match self.questions.iter_mut().find(|q| q.key == question.key) {
            Some(slot) => {
                *slot = question;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: QuestionKey) -> Option<Question> {
        let index = self.questions.iter().position(|q| q.key == key)?;
        Some(self.questions.remove(index))
    }

    /// Write derived fields back onto a question without reordering.
    pub fn update_derived(&mut self, key: QuestionKey, update: impl FnOnce(&mut Question)) -> bool {
        match self.questions.iter_mut().find(|q| q.key == key) {
            Some(question) => {
                update(question);
                true
            }
            None => false,
        }
    }
}
