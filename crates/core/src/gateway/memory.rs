//! A fixed in-memory dataset answering the same lookups as Overpass.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures_util::{FutureExt, future::BoxFuture};
use geo::{BoundingRect, Contains, Intersects, MultiLineString, Point, Rect};
use zone_transit::{StaticTransitProvider, TransitProvider};

use crate::{
    config::EngineConfig,
    error::Result,
    question::{AdminArea, Landmark, LandmarkCategory, QuestionContext},
};

pub struct MemoryContext {
    config: EngineConfig,
    play_area: Rect,
    landmarks: HashMap<LandmarkCategory, Vec<Landmark>>,
    admin_areas: Vec<AdminArea>,
    coastline: MultiLineString,
    transit: Arc<dyn TransitProvider>,
    lookups: AtomicUsize,
}

impl MemoryContext {
    pub fn new(play_area: Rect) -> Self {
        MemoryContext {
            config: EngineConfig::default(),
            play_area,
            landmarks: HashMap::new(),
            admin_areas: Vec::new(),
            coastline: MultiLineString::new(vec![]),
            transit: Arc::new(StaticTransitProvider::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_landmarks(mut self, category: LandmarkCategory, landmarks: Vec<Landmark>) -> Self {
        self.landmarks.entry(category).or_default().extend(landmarks);
        self
    }

    pub fn with_admin_area(mut self, area: AdminArea) -> Self {
        self.admin_areas.push(area);
        self
    }

    pub fn with_coastline(mut self, coastline: MultiLineString) -> Self {
        self.coastline = coastline;
        self
    }

    pub fn with_transit(mut self, transit: Arc<dyn TransitProvider>) -> Self {
        self.transit = transit;
        self
    }

    /// Number of lookups answered so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }
}

impl QuestionContext for MemoryContext {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn play_area(&self) -> Rect {
        self.play_area
    }

    fn landmarks(
        &self,
        category: LandmarkCategory,
        bbox: Rect,
    ) -> BoxFuture<'_, Result<Vec<Landmark>>> {
        self.count();
        let found = self
            .landmarks
            .get(&category)
            .map(|all| {
                all.iter()
                    .filter(|l| bbox.intersects(&l.position()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        async move { Ok(found) }.boxed()
    }

    fn admin_area_at(
        &self,
        point: Point,
        admin_level: u8,
    ) -> BoxFuture<'_, Result<Option<AdminArea>>> {
        self.count();
        let found = self
            .admin_areas
            .iter()
            .find(|a| a.admin_level == admin_level && a.boundary.contains(&point))
            .cloned();
        async move { Ok(found) }.boxed()
    }

    fn admin_areas(&self, admin_level: u8, bbox: Rect) -> BoxFuture<'_, Result<Vec<AdminArea>>> {
        self.count();
        let found = self
            .admin_areas
            .iter()
            .filter(|a| a.admin_level == admin_level)
            .filter(|a| a.boundary.bounding_rect().is_some_and(|r| r.intersects(&bbox)))
            .cloned()
            .collect();
        async move { Ok(found) }.boxed()
    }

    fn coastline(&self, _bbox: Rect) -> BoxFuture<'_, Result<MultiLineString>> {
        self.count();
        let coastline = self.coastline.clone();
        async move { Ok(coastline) }.boxed()
    }

    fn stations(&self, _bbox: Rect) -> BoxFuture<'_, Result<Arc<dyn TransitProvider>>> {
        self.count();
        let transit = self.transit.clone();
        async move { Ok(transit) }.boxed()
    }
}
