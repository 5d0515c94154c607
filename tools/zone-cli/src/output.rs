use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::json;
use std::path::Path;
use zone_core::{
    geometry::{self, convert},
    hiding_zone::Candidate,
};

/// Write a FeatureCollection to disk
pub fn write_collection(collection: FeatureCollection, path: &Path) -> Result<()> {
    let geojson = GeoJson::FeatureCollection(collection);
    let json = serde_json::to_string_pretty(&geojson).context("Failed to serialize GeoJSON")?;

    std::fs::write(path, json)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;

    Ok(())
}

/// One feature per surviving hiding zone, tagged with its station.
pub fn hiding_zone_features(candidates: &[Candidate]) -> Vec<Feature> {
    candidates
        .iter()
        .map(|candidate| {
            let zone = geometry::single(candidate.zone.clone());
            let mut feature = convert::region_feature(&zone, "hiding_zone");
            if let Some(properties) = feature.properties.as_mut() {
                properties.insert(
                    "station_id".to_string(),
                    json!(candidate.station.id().as_str()),
                );
                properties.insert("station_name".to_string(), json!(candidate.name()));
                properties.insert(
                    "radius_m".to_string(),
                    json!(candidate.circle.radius.get()),
                );
            }
            feature
        })
        .collect()
}
