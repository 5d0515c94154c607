//! Versioned recomputation of the feasible region and hiding zones.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use futures_util::future::BoxFuture;
use geo::{MultiLineString, MultiPolygon, Point, Rect};
use tokio::sync::RwLock;
use zone_transit::{StationIdentifier, TransitProvider};

use crate::{
    config::EngineConfig,
    error::{GatewayError, ResolveError, Result},
    gateway::{CacheTier, CachedGateway, OverpassContext, OverpassGateway, TieredCache},
    geometry,
    hiding_zone::{self, Candidate, Refinement},
    question::{AdminArea, Landmark, LandmarkCategory, QuestionContext, context::lookup_area},
    region::FeasibleRegion,
    resolver::{self, Resolution},
    store::QuestionStore,
};

/// The last committed result.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub generation: u64,
    pub resolution: Option<Resolution>,
    pub candidates: Vec<Candidate>,
    pub refined: Option<Refinement>,
}

impl EngineState {
    pub fn region(&self) -> Option<&FeasibleRegion> {
        self.resolution.as_ref().map(|r| &r.region)
    }
}

#[derive(Debug)]
pub enum RecomputeOutcome {
    Committed { generation: u64, empty: bool },
    /// A newer recomputation started before this one finished.
    Superseded { generation: u64, latest: u64 },
    /// Nothing was committed; the previous state stands.
    Failed(ResolveError),
}

pub struct Engine {
    context: Arc<dyn QuestionContext>,
    cache: Option<Arc<TieredCache>>,
    transit: Option<Arc<dyn TransitProvider>>,
    store: RwLock<QuestionStore>,
    state: RwLock<Arc<EngineState>>,
    generation: AtomicU64,
}

impl Engine {
    pub fn new(context: Arc<dyn QuestionContext>, store: QuestionStore) -> Self {
        Engine {
            context,
            cache: None,
            transit: None,
            store: RwLock::new(store),
            state: RwLock::new(Arc::new(EngineState::default())),
            generation: AtomicU64::new(0),
        }
    }

    /// An engine answering lookups from Overpass, cached per `config`.
    pub fn overpass(config: EngineConfig, store: QuestionStore) -> Result<Self, GatewayError> {
        let cache = Arc::new(match &config.permanent_cache_path {
            Some(path) => TieredCache::with_permanent_file(path)?,
            None => TieredCache::in_memory(),
        });
        let transport = Arc::new(OverpassGateway::new(&config)?);
        let gateway = Arc::new(CachedGateway::new(transport, cache.clone(), config.retry.clone()));
        let play_area = geometry::bounds(store.boundary()).unwrap_or_else(geometry::world_rect);
        let context = OverpassContext::new(gateway, Arc::new(config), play_area);

        Ok(Engine::new(Arc::new(context), store).with_cache(cache))
    }

    pub fn with_cache(mut self, cache: Arc<TieredCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use a fixed station set instead of looking stations up.
    pub fn with_transit(mut self, transit: Arc<dyn TransitProvider>) -> Self {
        self.transit = Some(transit);
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> Arc<EngineState> {
        Arc::clone(&*self.state.read().await)
    }

    /// A copy of the current questions and boundary.
    pub async fn store(&self) -> QuestionStore {
        self.store.read().await.clone()
    }

    /// Edit the questions. Takes effect on the next [`Engine::recompute`].
    pub async fn update_store<R>(&self, edit: impl FnOnce(&mut QuestionStore) -> R) -> R {
        edit(&mut *self.store.write().await)
    }

    /// Replace the base boundary, clearing the zone cache tier if it changed.
    pub async fn set_boundary(&self, boundary: MultiPolygon) -> Result<bool, GatewayError> {
        let changed = self.store.write().await.set_boundary(boundary);
        if changed {
            if let Some(cache) = &self.cache {
                cache.on_boundary_changed().await?;
            }
        }
        Ok(changed)
    }

    /// Resolve, build and eliminate hiding zones, then commit unless a newer
    /// recomputation has started in the meantime.
    pub async fn recompute(&self) -> RecomputeOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let store = self.store().await;

        let result = self.run(&store).await;

        let (resolution, candidates) = match result {
            Ok(done) => done,
            Err(err) => {
                tracing::warn!(generation, %err, "recomputation failed, keeping previous state");
                return RecomputeOutcome::Failed(err);
            }
        };

        let mut state = self.state.write().await;
        let latest = self.generation();
        if latest != generation {
            tracing::warn!(generation, latest, "discarding stale recomputation");
            return RecomputeOutcome::Superseded { generation, latest };
        }

        // Only a committing run clears the ephemeral tier.
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.invalidate(CacheTier::Ephemeral).await {
                tracing::warn!(%err, "could not clear the ephemeral cache tier");
            }
        }

        {
            let mut store = self.store.write().await;
            for (key, places) in &resolution.derived {
                store.update_derived(*key, |q| q.set_places(places.clone()));
            }
        }

        let empty = resolution.is_empty();
        *state = Arc::new(EngineState {
            generation,
            resolution: Some(resolution),
            candidates,
            refined: None,
        });
        tracing::info!(generation, empty, "state committed");

        RecomputeOutcome::Committed { generation, empty }
    }

    async fn run(&self, store: &QuestionStore) -> Result<(Resolution, Vec<Candidate>)> {
        let ctx = Bounded::new(self.context.as_ref(), store.boundary());
        let resolution = resolver::resolve(store, &ctx).await?;
        if resolution.is_empty() {
            return Ok((resolution, Vec::new()));
        }

        let config = ctx.config();
        let transit = match &self.transit {
            Some(transit) => Arc::clone(transit),
            None => ctx.stations(lookup_area(&ctx)).await?,
        };
        let candidates = hiding_zone::build_candidates(
            &transit.all_stations(),
            config.hiding_radius_m(),
            &resolution.region,
            config.circle_steps,
        )?;
        let candidates =
            hiding_zone::eliminate(candidates, store.active_questions(), transit.as_ref(), &ctx)
                .await?;

        Ok((resolution, candidates))
    }

    /// Refine one surviving candidate and commit it with a viewport to fit.
    pub async fn refine_station(&self, station: &StationIdentifier) -> Result<Arc<EngineState>> {
        let current = self.state().await;
        let generation = current.generation;
        let Some(resolution) = &current.resolution else {
            return Err(ResolveError::NotRefinable {
                station: station.to_string(),
                reason: "nothing has been resolved yet",
            });
        };
        let Some(candidate) = current.candidates.iter().find(|c| c.station.id() == station)
        else {
            return Err(ResolveError::NotRefinable {
                station: station.to_string(),
                reason: "no surviving hiding zone",
            });
        };

        let store = self.store().await;
        let ctx = Bounded::new(self.context.as_ref(), store.boundary());
        let feasible = resolution.region.direct_polygons()?;
        let refinement =
            hiding_zone::refine_station(candidate, &feasible, store.active_questions(), &ctx)
                .await?;

        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::warn!(generation, latest = state.generation, "region moved on during refinement");
            return Ok(Arc::clone(&*state));
        }

        let mut next = EngineState::clone(&state);
        next.refined = Some(refinement);
        *state = Arc::new(next);
        Ok(Arc::clone(&*state))
    }
}

/// Answers lookups from the wrapped context, scoped to the current boundary.
struct Bounded<'a> {
    inner: &'a dyn QuestionContext,
    play_area: Rect,
}

impl<'a> Bounded<'a> {
    fn new(inner: &'a dyn QuestionContext, boundary: &MultiPolygon) -> Self {
        let play_area = geometry::bounds(boundary).unwrap_or_else(|| inner.play_area());
        Bounded { inner, play_area }
    }
}

impl QuestionContext for Bounded<'_> {
    fn config(&self) -> &EngineConfig {
        self.inner.config()
    }

    fn play_area(&self) -> Rect {
        self.play_area
    }

    fn landmarks(
        &self,
        category: LandmarkCategory,
        bbox: Rect,
    ) -> BoxFuture<'_, Result<Vec<Landmark>>> {
        self.inner.landmarks(category, bbox)
    }

    fn landmarks_near(
        &self,
        category: LandmarkCategory,
        center: Point,
        radius_m: f64,
    ) -> BoxFuture<'_, Result<Vec<Landmark>>> {
        self.inner.landmarks_near(category, center, radius_m)
    }

    fn admin_area_at(
        &self,
        point: Point,
        admin_level: u8,
    ) -> BoxFuture<'_, Result<Option<AdminArea>>> {
        self.inner.admin_area_at(point, admin_level)
    }

    fn admin_areas(&self, admin_level: u8, bbox: Rect) -> BoxFuture<'_, Result<Vec<AdminArea>>> {
        self.inner.admin_areas(admin_level, bbox)
    }

    fn coastline(&self, bbox: Rect) -> BoxFuture<'_, Result<MultiLineString>> {
        self.inner.coastline(bbox)
    }

    fn stations(&self, bbox: Rect) -> BoxFuture<'_, Result<Arc<dyn TransitProvider>>> {
        self.inner.stations(bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::{CacheEntry, MemoryContext},
        geometry::testing::square_mp,
        question::{Question, QuestionKey},
    };
    use geo::Coord;
    use tokio::sync::Semaphore;

    fn area() -> Rect {
        Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })
    }

    fn radius(key: f64, within: bool) -> Question {
        serde_json::from_value(serde_json::json!({
            "id": "radius",
            "key": key,
            "data": { "lat": 0.5, "lng": 0.5, "radius": 10, "unit": "kilometers", "within": within }
        }))
        .unwrap()
    }

    fn zoo_matching(key: f64) -> Question {
        serde_json::from_value(serde_json::json!({
            "id": "matching",
            "key": key,
            "data": { "lat": 0.5, "lng": 0.5, "type": "zoo", "same": true }
        }))
        .unwrap()
    }

    /// Holds every landmark lookup until a permit is released.
    struct Gated {
        inner: MemoryContext,
        gate: Arc<Semaphore>,
    }

    impl QuestionContext for Gated {
        fn config(&self) -> &EngineConfig {
            self.inner.config()
        }

        fn play_area(&self) -> Rect {
            self.inner.play_area()
        }

        fn landmarks(
            &self,
            category: LandmarkCategory,
            bbox: Rect,
        ) -> BoxFuture<'_, Result<Vec<Landmark>>> {
            Box::pin(async move {
                let _permit = self.gate.acquire().await.unwrap();
                self.inner.landmarks(category, bbox).await
            })
        }

        fn admin_area_at(
            &self,
            point: Point,
            admin_level: u8,
        ) -> BoxFuture<'_, Result<Option<AdminArea>>> {
            self.inner.admin_area_at(point, admin_level)
        }

        fn admin_areas(
            &self,
            admin_level: u8,
            bbox: Rect,
        ) -> BoxFuture<'_, Result<Vec<AdminArea>>> {
            self.inner.admin_areas(admin_level, bbox)
        }

        fn coastline(&self, bbox: Rect) -> BoxFuture<'_, Result<MultiLineString>> {
            self.inner.coastline(bbox)
        }

        fn stations(&self, bbox: Rect) -> BoxFuture<'_, Result<Arc<dyn TransitProvider>>> {
            self.inner.stations(bbox)
        }
    }

    #[tokio::test]
    async fn commits_and_counts_generations() {
        let store = QuestionStore::new(square_mp(0.0, 0.0, 1.0), vec![radius(1.0, true)]);
        let engine = Engine::new(Arc::new(MemoryContext::new(area())), store);

        let outcome = engine.recompute().await;
        assert!(matches!(outcome, RecomputeOutcome::Committed { generation: 1, empty: false }));

        engine.update_store(|s| s.push(radius(2.0, false))).await;
        let outcome = engine.recompute().await;
        assert!(matches!(outcome, RecomputeOutcome::Committed { generation: 2, empty: true }));
        assert_eq!(engine.state().await.generation, 2);
    }

    #[tokio::test]
    async fn failure_keeps_the_previous_region() {
        let store = QuestionStore::new(square_mp(0.0, 0.0, 1.0), vec![radius(1.0, true)]);
        let engine = Engine::new(Arc::new(MemoryContext::new(area())), store);
        engine.recompute().await;
        let before = engine.state().await;

        // No zoos anywhere, so the matching question cannot be lowered.
        engine.update_store(|s| s.push(zoo_matching(2.0))).await;
        let outcome = engine.recompute().await;

        assert!(matches!(outcome, RecomputeOutcome::Failed(_)));
        let after = engine.state().await;
        assert_eq!(after.generation, 1);
        assert_eq!(after.region(), before.region());
    }

    #[tokio::test]
    async fn slow_recomputation_is_superseded() {
        let gate = Arc::new(Semaphore::new(0));
        let zoo = Landmark::new("node/1", Some("Zoo".into()), Point::new(0.4, 0.4));
        let ctx = Gated {
            inner: MemoryContext::new(area()).with_landmarks(LandmarkCategory::Zoo, vec![zoo]),
            gate: gate.clone(),
        };
        let store = QuestionStore::new(square_mp(0.0, 0.0, 1.0), vec![zoo_matching(1.0)]);
        let cache = Arc::new(TieredCache::in_memory());
        let engine = Engine::new(Arc::new(ctx), store).with_cache(cache.clone());

        let slow = engine.recompute();
        let fast = async {
            tokio::task::yield_now().await;
            engine
                .update_store(|s| {
                    s.remove(QuestionKey(1.0));
                    s.push(radius(2.0, true));
                })
                .await;
            let outcome = engine.recompute().await;
            // A lookup made after the commit, e.g. by the next recomputation.
            cache
                .put(CacheTier::Ephemeral, "around", CacheEntry::success("[]".into()))
                .await
                .unwrap();
            gate.add_permits(8);
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(matches!(fast, RecomputeOutcome::Committed { generation: 2, .. }));
        assert!(matches!(slow, RecomputeOutcome::Superseded { generation: 1, latest: 2 }));
        assert_eq!(engine.state().await.generation, 2);
        assert_eq!(cache.len(CacheTier::Ephemeral).await, 1);
    }

    #[tokio::test]
    async fn committing_clears_the_ephemeral_tier() {
        let store = QuestionStore::new(square_mp(0.0, 0.0, 1.0), vec![radius(1.0, true)]);
        let cache = Arc::new(TieredCache::in_memory());
        let engine =
            Engine::new(Arc::new(MemoryContext::new(area())), store).with_cache(cache.clone());
        cache
            .put(CacheTier::Ephemeral, "around", CacheEntry::success("[]".into()))
            .await
            .unwrap();
        cache
            .put(CacheTier::Zone, "stations", CacheEntry::success("[]".into()))
            .await
            .unwrap();

        let outcome = engine.recompute().await;

        assert!(matches!(outcome, RecomputeOutcome::Committed { .. }));
        assert_eq!(cache.len(CacheTier::Ephemeral).await, 0);
        assert_eq!(cache.len(CacheTier::Zone).await, 1);
    }

    #[tokio::test]
    async fn refining_needs_a_surviving_zone() {
        let store = QuestionStore::new(square_mp(0.0, 0.0, 1.0), vec![]);
        let engine = Engine::new(Arc::new(MemoryContext::new(area())), store);
        engine.recompute().await;

        let err = engine
            .refine_station(&StationIdentifier::new("node/404"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotRefinable { .. }));
    }
}
