use std::sync::Arc;

use futures_util::future::BoxFuture;
use geo::{MultiLineString, MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};
use zone_transit::TransitProvider;

use crate::{config::EngineConfig, error::Result, question::LandmarkCategory};

/// A named point of interest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl Landmark {
    pub fn new(id: impl Into<String>, name: Option<String>, position: Point) -> Self {
        Landmark {
            id: id.into(),
            name,
            lat: position.y(),
            lng: position.x(),
        }
    }

    pub fn position(&self) -> Point {
        crate::geometry::point(self.lat, self.lng)
    }
}

/// An administrative boundary.
#[derive(Clone, Debug)]
pub struct AdminArea {
    pub id: String,
    pub name: Option<String>,
    pub admin_level: u8,
    pub boundary: MultiPolygon,
}

/// Everything a question needs to turn itself into a shape.
///
/// Lookups may go to the network; implementations cache as they see fit.
pub trait QuestionContext: Send + Sync {
    fn config(&self) -> &EngineConfig;

    /// Bounding box of the base boundary; the default scope of lookups.
    fn play_area(&self) -> Rect;

    /// Instances of a category across an area, usually the whole play area.
    fn landmarks(
        &self,
        category: LandmarkCategory,
        bbox: Rect,
    ) -> BoxFuture<'_, Result<Vec<Landmark>>>;

    /// Instances of a category around one point. Used by per-question and
    /// per-station searches; results are not expected to outlive a
    /// resolution.
    fn landmarks_near(
        &self,
        category: LandmarkCategory,
        center: Point,
        radius_m: f64,
    ) -> BoxFuture<'_, Result<Vec<Landmark>>> {
        let bbox = crate::geometry::expand_rect(Rect::new(center.0, center.0), radius_m);
        self.landmarks(category, bbox)
    }

    /// The boundary at `admin_level` enclosing `point`, if any.
    fn admin_area_at(
        &self,
        point: Point,
        admin_level: u8,
    ) -> BoxFuture<'_, Result<Option<AdminArea>>>;

    fn admin_areas(&self, admin_level: u8, bbox: Rect) -> BoxFuture<'_, Result<Vec<AdminArea>>>;

    fn coastline(&self, bbox: Rect) -> BoxFuture<'_, Result<MultiLineString>>;

    fn stations(&self, bbox: Rect) -> BoxFuture<'_, Result<Arc<dyn TransitProvider>>>;
}

/// The play area grown by the initial search radius, so instances just
/// outside the boundary still take part in nearest-instance questions.
pub fn lookup_area(ctx: &dyn QuestionContext) -> Rect {
    let margin = ctx.config().search.initial_radius.meters().get();
    crate::geometry::expand_rect(ctx.play_area(), margin)
}
