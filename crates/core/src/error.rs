use crate::{
    question::{LandmarkCategory, QuestionKey},
    region::Representation,
};

/// A shape was folded into a region held in the wrong representation.
///
/// Partitioning in the resolver makes this impossible for well-formed input;
/// seeing it means a retaining shape reached the complement phase or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("shape requires the {expected} representation but the region is {found}")]
pub struct RepresentationMismatch {
    pub expected: Representation,
    pub found: Representation,
}

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("polygon {0} panicked inside the boolean-op kernel")]
    BooleanOpPanicked(&'static str),

    #[error("unsupported geometry: {0}")]
    Unsupported(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("query service answered with status {0}")]
    Status(u16),

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("permanent cache: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Representation(#[from] RepresentationMismatch),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("question {key}: {what}")]
    MissingData { key: QuestionKey, what: String },

    #[error("station {station} cannot be refined: {reason}")]
    NotRefinable {
        station: String,
        reason: &'static str,
    },

    #[error(
        "no stable set of {category} found within {max_radius_m:.0} m after {iterations} searches"
    )]
    SearchExhausted {
        category: LandmarkCategory,
        max_radius_m: f64,
        iterations: u32,
    },
}

impl ResolveError {
    pub fn missing(key: QuestionKey, what: impl Into<String>) -> Self {
        ResolveError::MissingData {
            key,
            what: what.into(),
        }
    }
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
