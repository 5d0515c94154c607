pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod geometry;
pub mod hiding_zone;
pub mod question;
pub mod region;
pub mod resolver;
pub mod store;
pub mod units;

pub use config::EngineConfig;
pub use engine::{Engine, EngineState, RecomputeOutcome};
pub use error::{GatewayError, GeometryError, ResolveError, Result};
pub use question::{Question, QuestionKey, QuestionKind};
pub use region::{Constraint, FeasibleRegion, Representation};
pub use resolver::Resolution;
pub use store::{GameState, QuestionStore};

// Re-export transit from the transit crate
pub use zone_transit as transit;
