use std::sync::Arc;

use futures_util::{FutureExt, future::BoxFuture};
use geo::{Contains, MultiLineString, Point, Rect};
use zone_transit::{
    LineIdentifier, LineImpl, StaticTransitProvider, StationIdentifier, StationImpl,
    TransitProvider,
};

use super::{CacheTier, CachedGateway, OverpassResponse, osm::Element, query};
use crate::{
    config::EngineConfig,
    error::Result,
    question::{AdminArea, Landmark, LandmarkCategory, QuestionContext},
};

/// Question lookups answered by Overpass through the cached gateway.
pub struct OverpassContext {
    gateway: Arc<CachedGateway>,
    config: Arc<EngineConfig>,
    play_area: Rect,
}

impl OverpassContext {
    pub fn new(gateway: Arc<CachedGateway>, config: Arc<EngineConfig>, play_area: Rect) -> Self {
        OverpassContext {
            gateway,
            config,
            play_area,
        }
    }

    fn timeout(&self) -> u64 {
        self.config.request_timeout_secs
    }

    async fn fetch_landmarks(
        &self,
        category: LandmarkCategory,
        bbox: Rect,
        tier: CacheTier,
    ) -> Result<Vec<Landmark>> {
        let q = query::landmarks(category, bbox, self.timeout());
        let response = self.gateway.fetch(&q, tier).await?;
        let landmarks = response.landmarks();
        tracing::debug!(%category, count = landmarks.len(), "landmarks fetched");
        Ok(landmarks)
    }

    async fn fetch_admin_area_at(&self, point: Point, level: u8) -> Result<Option<AdminArea>> {
        let q = query::admin_boundary_at(point, level, self.timeout());
        let response = self.gateway.fetch(&q, CacheTier::Permanent).await?;
        Ok(response
            .admin_areas()
            .into_iter()
            .find(|a| a.boundary.contains(&point)))
    }

    async fn fetch_admin_areas(&self, level: u8, bbox: Rect) -> Result<Vec<AdminArea>> {
        let q = query::admin_boundaries(level, bbox, self.timeout());
        Ok(self.gateway.fetch(&q, CacheTier::Permanent).await?.admin_areas())
    }

    async fn fetch_coastline(&self, bbox: Rect) -> Result<MultiLineString> {
        let q = query::coastline(bbox, self.timeout());
        Ok(self.gateway.fetch(&q, CacheTier::Permanent).await?.lines())
    }

    async fn fetch_stations(&self, bbox: Rect) -> Result<Arc<dyn TransitProvider>> {
        let q = query::stations(bbox, self.timeout());
        let response = self.gateway.fetch(&q, CacheTier::Zone).await?;
        Ok(Arc::new(transit_from_response(&response)))
    }
}

/// Station nodes become stations; route relations that list them become lines.
pub fn transit_from_response(response: &OverpassResponse) -> StaticTransitProvider {
    let mut stations = Vec::new();
    let mut lines = Vec::new();

    for element in &response.elements {
        match element {
            Element::Node { .. } => {
                let (Some(name), Some(location)) = (element.name(), element.position()) else {
                    continue;
                };
                stations.push(StationImpl {
                    id: StationIdentifier::new(&element.osm_id()),
                    name: name.into(),
                    location,
                    line_ids: Vec::new(),
                });
            }
            Element::Relation { members, tags, .. } => {
                let name = tags
                    .get("name")
                    .or_else(|| tags.get("ref"))
                    .cloned()
                    .unwrap_or_else(|| element.osm_id());
                let station_ids = members
                    .iter()
                    .filter(|m| m.kind == "node")
                    .map(|m| StationIdentifier::new(&format!("node/{}", m.id)))
                    .collect();

                lines.push(LineImpl {
                    id: LineIdentifier::new(&element.osm_id()),
                    name: name.into(),
                    station_ids,
                });
            }
            Element::Way { .. } => {}
        }
    }

    tracing::debug!(
        stations = stations.len(),
        lines = lines.len(),
        "transit data assembled"
    );
    StaticTransitProvider::from_data(stations, lines)
}

impl QuestionContext for OverpassContext {
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
        self.fetch_landmarks(category, bbox, CacheTier::Zone).boxed()
    }

    fn landmarks_near(
        &self,
        category: LandmarkCategory,
        center: Point,
        radius_m: f64,
    ) -> BoxFuture<'_, Result<Vec<Landmark>>> {
        let bbox = crate::geometry::expand_rect(Rect::new(center.0, center.0), radius_m);
        self.fetch_landmarks(category, bbox, CacheTier::Ephemeral).boxed()
    }

    fn admin_area_at(
        &self,
        point: Point,
        admin_level: u8,
    ) -> BoxFuture<'_, Result<Option<AdminArea>>> {
        self.fetch_admin_area_at(point, admin_level).boxed()
    }

    fn admin_areas(&self, admin_level: u8, bbox: Rect) -> BoxFuture<'_, Result<Vec<AdminArea>>> {
        self.fetch_admin_areas(admin_level, bbox).boxed()
    }

    fn coastline(&self, bbox: Rect) -> BoxFuture<'_, Result<MultiLineString>> {
        self.fetch_coastline(bbox).boxed()
    }

    fn stations(&self, bbox: Rect) -> BoxFuture<'_, Result<Arc<dyn TransitProvider>>> {
        self.fetch_stations(bbox).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::RetryPolicy, gateway::{TieredCache, testing::Flaky}};
    use geo::Coord;
    use zone_transit::TransitStation;

    const STATIONS: &str = r#"{"elements":[
        {"type":"node","id":1,"lat":51.50,"lon":-0.10,"tags":{"name":"Abbey"}},
        {"type":"node","id":2,"lat":51.51,"lon":-0.12,"tags":{"name":"Apple"}},
        {"type":"node","id":3,"lat":51.52,"lon":-0.14,"tags":{}},
        {"type":"relation","id":10,"tags":{"ref":"R1"},"members":[
            {"type":"node","ref":1,"role":"stop"},{"type":"node","ref":2,"role":"stop"}
        ]}
    ]}"#;

    #[test]
    fn stations_join_their_routes() {
        let response: OverpassResponse = serde_json::from_str(STATIONS).unwrap();
        let provider = transit_from_response(&response);

        assert_eq!(provider.len(), 2);
        let abbey = provider
            .get_station(&StationIdentifier::new("node/1"))
            .unwrap();
        assert!(abbey.serves_line(&LineIdentifier::new("relation/10")));
    }

    #[tokio::test]
    async fn context_goes_through_the_gateway() {
        let transport = Arc::new(Flaky::new(0, STATIONS));
        let gateway_cache = Arc::new(TieredCache::in_memory());
        let gateway = Arc::new(CachedGateway::new(
            transport,
            gateway_cache.clone(),
            RetryPolicy::default(),
        ));
        let area = Rect::new(Coord { x: -0.2, y: 51.4 }, Coord { x: 0.0, y: 51.6 });
        let ctx = OverpassContext::new(gateway, Arc::new(EngineConfig::default()), area);

        let landmarks = ctx.landmarks(LandmarkCategory::Zoo, area).await.unwrap();
        assert_eq!(landmarks.len(), 3);

        ctx.landmarks_near(LandmarkCategory::Zoo, Point::new(-0.1, 51.5), 1_000.0)
            .await
            .unwrap();
        assert_eq!(gateway_cache.len(CacheTier::Zone).await, 1);
        assert_eq!(gateway_cache.len(CacheTier::Ephemeral).await, 1);
    }
}
