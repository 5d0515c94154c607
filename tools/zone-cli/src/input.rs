use anyhow::{Context, Result};
use geo::MultiPolygon;
use geojson::GeoJson;
use std::collections::HashMap;
use std::path::Path;
use zone_core::{EngineConfig, GameState, geometry::convert};
use zone_transit::{LineIdentifier, LineImpl, StaticTransitProvider, StationIdentifier, StationImpl};

fn read_geojson(path: &Path) -> Result<GeoJson> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    text.parse::<GeoJson>()
        .with_context(|| format!("Failed to parse GeoJSON from {}", path.display()))
}

/// Read a game-state payload: a bare question array or a Feature carrying one.
pub fn read_state(path: &Path) -> Result<GameState> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    GameState::from_json(&text).with_context(|| format!("Invalid game state in {}", path.display()))
}

/// Read the base boundary from any GeoJSON holding polygons.
pub fn read_boundary(path: &Path) -> Result<MultiPolygon> {
    let geojson = read_geojson(path)?;
    convert::boundary_from_geojson(&geojson)
        .with_context(|| format!("No usable boundary in {}", path.display()))
}

/// Engine settings from a JSON file, or the defaults.
pub fn read_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config in {}", path.display()))
}

/// Read stations from point features.
///
/// Each feature needs a `name` property; `id` falls back to the feature id and
/// then to the feature index. An optional `lines` array lists line ids.
pub fn read_stations(path: &Path) -> Result<StaticTransitProvider> {
    let GeoJson::FeatureCollection(collection) = read_geojson(path)? else {
        anyhow::bail!("Expected a FeatureCollection in {}", path.display());
    };

    let mut stations = Vec::new();
    let mut members: HashMap<LineIdentifier, Vec<StationIdentifier>> = HashMap::new();

    for (index, feature) in collection.features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let Ok(geo::Geometry::Point(location)) = convert::to_geometry(&geometry.value) else {
            log::warn!("  Skipping feature {index}: not a point");
            continue;
        };
        let Some(name) = feature.property("name").and_then(|v| v.as_str()) else {
            log::warn!("  Skipping feature {index}: no name");
            continue;
        };

        let id = match (feature.property("id"), &feature.id) {
            (Some(serde_json::Value::String(id)), _) => id.clone(),
            (Some(serde_json::Value::Number(id)), _) => id.to_string(),
            (_, Some(geojson::feature::Id::String(id))) => id.clone(),
            (_, Some(geojson::feature::Id::Number(id))) => id.to_string(),
            _ => index.to_string(),
        };
        let id = StationIdentifier::new(id);

        let line_ids: Vec<LineIdentifier> = feature
            .property("lines")
            .and_then(|v| v.as_array())
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|l| l.as_str())
                    .map(LineIdentifier::new)
                    .collect()
            })
            .unwrap_or_default();

        for line in &line_ids {
            members.entry(line.clone()).or_default().push(id.clone());
        }

        stations.push(StationImpl {
            id,
            name: name.into(),
            location,
            line_ids,
        });
    }

    let lines = members
        .into_iter()
        .map(|(id, station_ids)| LineImpl {
            name: id.as_str().into(),
            id,
            station_ids,
        })
        .collect();

    log::info!("  Loaded {} stations", stations.len());
    Ok(StaticTransitProvider::from_data(stations, lines))
}
